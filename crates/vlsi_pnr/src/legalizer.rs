//! Abacus legalisation: turns an overlapping placement into a row-aligned,
//! site-snapped, non-overlapping one while minimising squared displacement.
//!
//! Grounded on the reference `Legalizer`'s three-phase Abacus algorithm
//! (row projection, per-row cluster merging, site snap) plus a greedy
//! "tetris" row-fill alternate used for debugging.

use crate::placer_db::PlacerDB;
use vlsi_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use vlsi_netlist::CellId;
use vlsi_source::Span;

/// Outcome of a legalisation run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegalizationStats {
    /// Total squared displacement introduced by legalisation.
    pub total_displacement: f64,
    /// Number of movable cells legalised.
    pub cell_count: usize,
    /// Whether every row had enough width for its assigned cells.
    pub success: bool,
}

struct Cluster {
    /// Cells in this cluster, left to right, by original index in the row.
    cells: Vec<usize>,
    /// Current start position (`x_C`).
    x: f64,
    /// Total width (`w_C`).
    width: f64,
    /// Total weight (`e_C`); unit weights per spec.
    weight: f64,
    /// Sum of weighted ideal starts (`q_C`).
    q: f64,
}

/// Runs Abacus legalisation on every movable cell in `db`. Rows are
/// enumerated `[0, n_rows)` at `y = core.y_min + k * row_height`; cells are
/// assigned to the nearest row by current center-y, then each row is
/// legalised independently (cluster-merge, then site snap). If any row
/// cannot fit its assigned cells, a [`Category::Geometry`] diagnostic is
/// emitted and that row's excess cells spill into the next empty row before
/// failure is finally reported.
pub fn legalize_abacus(db: &mut PlacerDB, sink: &DiagnosticSink) -> LegalizationStats {
    let core = db.core_area();
    let row_height = db.row_height();
    let n_rows = ((core.height / row_height).round() as u32).max(1);

    // Phase 1: project every movable cell onto its nearest row.
    let mut rows: Vec<Vec<CellId>> = vec![Vec::new(); n_rows as usize];
    for cell in db.movable_cells().collect::<Vec<_>>() {
        let info = *db.cell_info(cell);
        let (_, cy) = info.center();
        let row = (((cy - core.y) / row_height).round() as i64)
            .clamp(0, n_rows as i64 - 1) as usize;
        rows[row].push(cell);
    }

    let mut total_displacement = 0.0;
    let mut cell_count = 0;
    let mut success = true;
    let site_width = db.site_width();
    let row_x_min = core.x;
    let row_x_max = core.right();
    let row_capacity = row_x_max - row_x_min;

    // Overflow handling: a row whose assigned cells don't fit spills its
    // rightmost (by ideal x) cells into the next row that has no cells
    // assigned yet. If no later row is empty, the row is reported as a
    // geometry failure and legalised anyway (clamped, possibly overlapping
    // the row boundary) so the caller still gets a best-effort placement.
    let mut row_idx = 0usize;
    while row_idx < rows.len() {
        loop {
            let total_width: f64 = rows[row_idx].iter().map(|&c| db.cell_info(c).width).sum();
            if total_width <= row_capacity + 1e-9 {
                break;
            }
            let target = (row_idx + 1..rows.len()).find(|&r| rows[r].is_empty());
            match target {
                Some(r) => {
                    let rightmost = rows[row_idx]
                        .iter()
                        .enumerate()
                        .max_by(|(_, &a), (_, &b)| {
                            db.cell_info(a).x.partial_cmp(&db.cell_info(b).x).unwrap_or(std::cmp::Ordering::Equal)
                        })
                        .map(|(i, _)| i)
                        .expect("row_cells non-empty since total_width exceeded capacity");
                    let cell = rows[row_idx].remove(rightmost);
                    rows[r].push(cell);
                }
                None => {
                    success = false;
                    sink.emit(Diagnostic::error(
                        DiagnosticCode::new(Category::Geometry, 1),
                        format!(
                            "row {row_idx} has {n} cells totalling {total_width:.4} width but only \
                             {avail:.4} available, and no later row is free to absorb the overflow",
                            n = rows[row_idx].len(),
                            avail = row_capacity
                        ),
                        Span::DUMMY,
                    ));
                    break;
                }
            }
        }
        row_idx += 1;
    }

    for (row_idx, row_cells) in rows.iter().enumerate() {
        if row_cells.is_empty() {
            continue;
        }
        let row_y = core.y + row_idx as f64 * row_height;

        let mut cells_by_x: Vec<CellId> = row_cells.clone();
        cells_by_x.sort_by(|&a, &b| {
            db.cell_info(a)
                .x
                .partial_cmp(&db.cell_info(b).x)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let widths: Vec<f64> = cells_by_x.iter().map(|&c| db.cell_info(c).width).collect();
        let ideals: Vec<f64> = cells_by_x.iter().map(|&c| db.cell_info(c).x).collect();

        let final_x = abacus_row(&widths, &ideals, row_x_min, row_x_max);

        for (idx, &cell) in cells_by_x.iter().enumerate() {
            let info = *db.cell_info(cell);
            let displacement = (final_x[idx] - info.x).powi(2) + (row_y - info.y).powi(2);
            total_displacement += displacement;
            cell_count += 1;
        }

        let snapped = site_snap(&final_x, &widths, row_x_min, site_width);
        for (idx, &cell) in cells_by_x.iter().enumerate() {
            db.place_cell(cell, snapped[idx], row_y)
                .expect("cell registered in PlacerDB");
        }
    }

    LegalizationStats {
        total_displacement,
        cell_count,
        success,
    }
}

/// Phase 2: per-row cluster merging. Returns the final (pre-site-snap)
/// x position of every cell in `widths`/`ideals` order (already sorted by
/// ideal x).
fn abacus_row(widths: &[f64], ideals: &[f64], row_x_min: f64, row_x_max: f64) -> Vec<f64> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for (i, (&w, &ideal)) in widths.iter().zip(ideals.iter()).enumerate() {
        clusters.push(Cluster {
            cells: vec![i],
            x: ideal,
            width: w,
            weight: 1.0,
            q: ideal,
        });

        loop {
            if clusters.len() < 2 {
                // No previous cluster to merge into; a lone cluster that
                // still overflows the row (e.g. the very first cell dragged
                // past the right edge) has nowhere to push into, so clamp it
                // directly instead of leaving it outside the row.
                let only = clusters.last_mut().unwrap();
                only.x = only.x.clamp(row_x_min, row_x_max - only.width);
                break;
            }
            let merge = {
                let n = clusters.len();
                let prev_end = clusters[n - 2].x + clusters[n - 2].width;
                let cur = &clusters[n - 1];
                cur.x < prev_end - 1e-9 || cur.x + cur.width > row_x_max + 1e-9
            };
            if !merge {
                break;
            }
            let last = clusters.pop().unwrap();
            let prev = clusters.last_mut().unwrap();
            // `last`'s cells each had a q-contribution of `ideal_i - offset_i`
            // where `offset_i` was relative to `last`'s own start; merged
            // behind `prev`, every such offset grows by `prev.width`.
            let shifted_last_q = last.q - prev.width * last.weight;
            prev.cells.extend(last.cells);
            prev.width += last.width;
            prev.weight += last.weight;
            prev.q += shifted_last_q;
            prev.x = (prev.q / prev.weight).clamp(row_x_min, row_x_max - prev.width);
        }
    }

    let mut result = vec![0.0; widths.len()];
    for cluster in &clusters {
        let mut x = cluster.x;
        for &idx in &cluster.cells {
            result[idx] = x;
            x += widths[idx];
        }
    }
    result
}

/// Phase 3: site snap. Rounds each cell's x to the nearest site boundary,
/// never letting a cell back into the previous one.
fn site_snap(xs: &[f64], widths: &[f64], row_x_min: f64, site_width: f64) -> Vec<f64> {
    let mut result = vec![0.0; xs.len()];
    let mut prev_right = row_x_min;
    for (i, &x) in xs.iter().enumerate() {
        let sites = ((x - row_x_min) / site_width).round();
        let snapped = row_x_min + sites * site_width;
        let final_x = snapped.max(prev_right);
        result[i] = final_x;
        prev_right = final_x + widths[i];
    }
    result
}

/// Greedy "tetris" row-fill legaliser: sorts all movable cells by `(y, x)`
/// and packs them left-to-right, wrapping to the next row once a row is
/// full. No left-to-right ordering guarantee is preserved across rows;
/// displacement is typically higher than Abacus. Used for debugging and as
/// the spec's alternate legaliser.
pub fn legalize_greedy(db: &mut PlacerDB) -> LegalizationStats {
    let core = db.core_area();
    let row_height = db.row_height();
    let n_rows = ((core.height / row_height).round() as u32).max(1);
    let site_width = db.site_width();

    let mut cells: Vec<CellId> = db.movable_cells().collect();
    cells.sort_by(|&a, &b| {
        let ia = db.cell_info(a);
        let ib = db.cell_info(b);
        ia.y
            .partial_cmp(&ib.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ia.x.partial_cmp(&ib.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut row = 0usize;
    let mut cursor = core.x;
    let mut total_displacement = 0.0;
    let mut cell_count = 0;

    for cell in cells {
        let info = *db.cell_info(cell);
        loop {
            if row as u32 >= n_rows {
                break;
            }
            if cursor + info.width <= core.right() + 1e-9 {
                break;
            }
            row += 1;
            cursor = core.x;
        }
        if row as u32 >= n_rows {
            continue;
        }
        let sites = ((cursor - core.x) / site_width).round();
        let x = core.x + sites * site_width;
        let y = core.y + row as f64 * row_height;
        total_displacement += (x - info.x).powi(2) + (y - info.y).powi(2);
        cell_count += 1;
        db.place_cell(cell, x, y).expect("cell registered in PlacerDB");
        cursor = x + info.width;
    }

    LegalizationStats {
        total_displacement,
        cell_count,
        success: cell_count == db.movable_cells().count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlsi_netlist::Rect;

    fn make_db(cells: &[(f64, f64, f64, f64)], core: Rect, row_height: f64, site_width: f64) -> PlacerDB {
        let mut db = PlacerDB::new(core, row_height, site_width);
        for (i, &(x, y, w, h)) in cells.iter().enumerate() {
            let id = CellId::from_raw(i as u32);
            db.add_cell(id, w, h, false);
            db.place_cell(id, x, y).unwrap();
        }
        db
    }

    #[test]
    fn non_overlapping_cells_stay_in_place_order() {
        let core = Rect::new(0.0, 0.0, 10.0, 2.0);
        let mut db = make_db(&[(0.0, 0.0, 1.0, 2.0), (5.0, 0.0, 1.0, 2.0)], core, 2.0, 0.5);
        let stats = legalize_abacus(&mut db, &DiagnosticSink::new());
        assert!(stats.success);
        assert!(db.is_valid_placement());
        let a = db.cell_info(CellId::from_raw(0)).x;
        let b = db.cell_info(CellId::from_raw(1)).x;
        assert!(a < b);
    }

    #[test]
    fn overlapping_cells_are_spread_apart() {
        let core = Rect::new(0.0, 0.0, 10.0, 2.0);
        let mut db = make_db(
            &[(2.0, 0.0, 2.0, 2.0), (2.5, 0.0, 2.0, 2.0), (3.0, 0.0, 2.0, 2.0)],
            core,
            2.0,
            0.5,
        );
        let stats = legalize_abacus(&mut db, &DiagnosticSink::new());
        assert!(stats.success);
        assert!(db.is_valid_placement());
    }

    #[test]
    fn cells_snap_to_site_grid() {
        let core = Rect::new(0.0, 0.0, 10.0, 2.0);
        let mut db = make_db(&[(1.03, 0.0, 1.0, 2.0)], core, 2.0, 0.19);
        legalize_abacus(&mut db, &DiagnosticSink::new());
        let x = db.cell_info(CellId::from_raw(0)).x;
        assert!(db.is_site_aligned(x, 1e-9));
    }

    #[test]
    fn cells_snap_to_row_grid() {
        let core = Rect::new(0.0, 0.0, 10.0, 4.0);
        let mut db = make_db(&[(1.0, 0.3, 1.0, 2.0)], core, 2.0, 0.19);
        legalize_abacus(&mut db, &DiagnosticSink::new());
        let y = db.cell_info(CellId::from_raw(0)).y;
        assert!(((y - core.y) / 2.0).fract().abs() < 1e-9);
    }

    #[test]
    fn overflowing_row_reports_geometry_diagnostic() {
        let core = Rect::new(0.0, 0.0, 2.0, 2.0);
        let mut db = make_db(
            &[(0.0, 0.0, 2.0, 2.0), (0.5, 0.0, 2.0, 2.0)],
            core,
            2.0,
            0.5,
        );
        let sink = DiagnosticSink::new();
        let stats = legalize_abacus(&mut db, &sink);
        assert!(!stats.success);
        assert!(sink.has_errors());
    }

    #[test]
    fn overflowing_row_spills_into_next_empty_row() {
        // Two rows available, both cells land in row 0's capture window by
        // y-proximity but can't both fit in row 0's width; the rightmost
        // cell should spill into row 1, which is otherwise empty.
        let core = Rect::new(0.0, 0.0, 2.0, 4.0);
        let mut db = make_db(
            &[(0.0, 0.2, 2.0, 2.0), (0.5, 0.2, 2.0, 2.0)],
            core,
            2.0,
            0.5,
        );
        let sink = DiagnosticSink::new();
        let stats = legalize_abacus(&mut db, &sink);
        assert!(stats.success, "row 1 was free to absorb the overflow");
        assert!(!sink.has_errors());
        assert!(db.is_valid_placement());

        let ys: Vec<f64> = (0..2).map(|i| db.cell_info(CellId::from_raw(i)).y).collect();
        assert_ne!(ys[0], ys[1], "one cell should have spilled to the other row");
    }

    #[test]
    fn legalization_preserves_cell_count() {
        let core = Rect::new(0.0, 0.0, 20.0, 2.0);
        let mut db = make_db(
            &[(1.0, 0.0, 1.0, 2.0), (3.0, 0.0, 1.0, 2.0), (6.0, 0.0, 1.0, 2.0)],
            core,
            2.0,
            0.5,
        );
        let before = db.movable_cells().count();
        legalize_abacus(&mut db, &DiagnosticSink::new());
        assert_eq!(db.movable_cells().count(), before);
    }

    #[test]
    fn greedy_legalizer_packs_rows_left_to_right() {
        let core = Rect::new(0.0, 0.0, 4.0, 4.0);
        let mut db = make_db(
            &[(0.0, 0.0, 3.0, 2.0), (0.0, 0.0, 3.0, 2.0)],
            core,
            2.0,
            0.5,
        );
        let stats = legalize_greedy(&mut db);
        assert!(stats.success);
        assert!(db.is_valid_placement());
    }
}
