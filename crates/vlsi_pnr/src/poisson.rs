//! Hand-rolled FFT-based Poisson solver for the electrostatic placement model.
//!
//! Grounded on the reference `PoissonSolver` ("Hardcore Mode - No External
//! Dependencies!"): the density field is transformed to the frequency domain
//! with a radix-2 Cooley-Tukey FFT, divided by `u^2 + v^2` (the DC bin forced
//! to zero), transformed back, and the resulting potential field is
//! differentiated with a periodic-wrap central difference to produce the
//! per-bin force used by the Nesterov update. No FFT crate is used; this is
//! the one place in the workspace that implements its own transform.

use crate::density_grid::DensityGrid;
use std::f64::consts::PI;
use vlsi_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use vlsi_source::Span;

/// A complex number used internally by the FFT.
#[derive(Clone, Copy, Debug, Default)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    fn add(self, other: Complex) -> Complex {
        Complex::new(self.re + other.re, self.im + other.im)
    }

    fn sub(self, other: Complex) -> Complex {
        Complex::new(self.re - other.re, self.im - other.im)
    }

    fn mul(self, other: Complex) -> Complex {
        Complex::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }
}

/// Whether `n` is usable as an FFT length: a power of two, at least 2.
pub fn is_valid_fft_size(n: usize) -> bool {
    n >= 2 && n.is_power_of_two()
}

/// The smallest power of two greater than or equal to `n`.
pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Recursive radix-2 Cooley-Tukey FFT, in place. `data.len()` must be a
/// power of two. `invert` selects the inverse transform (without the `1/N`
/// normalization, which callers apply themselves).
fn fft1d(data: &mut [Complex], invert: bool) {
    let n = data.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());

    let mut even: Vec<Complex> = data.iter().step_by(2).copied().collect();
    let mut odd: Vec<Complex> = data.iter().skip(1).step_by(2).copied().collect();
    fft1d(&mut even, invert);
    fft1d(&mut odd, invert);

    let sign = if invert { 1.0 } else { -1.0 };
    for k in 0..n / 2 {
        let angle = sign * 2.0 * PI * k as f64 / n as f64;
        let twiddle = Complex::new(angle.cos(), angle.sin());
        let t = twiddle.mul(odd[k]);
        data[k] = even[k].add(t);
        data[k + n / 2] = even[k].sub(t);
    }
}

/// 2-D FFT over a row-major `ny x nx` grid, row transform then column
/// transform, matching the reference `fft2D`'s row-then-column order.
fn fft2d(grid: &mut [Vec<Complex>], invert: bool) {
    let ny = grid.len();
    if ny == 0 {
        return;
    }
    for row in grid.iter_mut() {
        fft1d(row, invert);
    }

    let nx = grid[0].len();
    let mut column = vec![Complex::default(); ny];
    for x in 0..nx {
        for y in 0..ny {
            column[y] = grid[y][x];
        }
        fft1d(&mut column, invert);
        for y in 0..ny {
            grid[y][x] = column[y];
        }
    }

    if invert {
        let norm = (nx * ny) as f64;
        for row in grid.iter_mut() {
            for c in row.iter_mut() {
                c.re /= norm;
                c.im /= norm;
            }
        }
    }
}

/// Maps a raw FFT bin index to the signed frequency it represents, given the
/// standard `[0, 1, ..., N/2, -N/2+1, ..., -1]` FFT bin ordering.
fn frequency_index(bin: usize, n: usize) -> i64 {
    if bin <= n / 2 {
        bin as i64
    } else {
        bin as i64 - n as i64
    }
}

/// `Phi_hat(u, v) = rho_hat(u, v) / (k_u^2 + k_v^2)`, with the DC bin (0, 0)
/// forced to zero since the Poisson equation has no unique solution for the
/// mean-density mode. `k_u`/`k_v` are the signed frequency indices scaled by
/// `2*pi/(nx*bin_w)` and `2*pi/(ny*bin_h)` per the spec, matching the
/// `2*bin_w`/`2*bin_h` scale `central_difference` uses on the other side of
/// the transform.
fn apply_poisson_filter(spectrum: &mut [Vec<Complex>], nx: usize, ny: usize, bin_w: f64, bin_h: f64) {
    for (v, row) in spectrum.iter_mut().enumerate() {
        for (u, value) in row.iter_mut().enumerate() {
            let fu = frequency_index(u, nx) as f64 * 2.0 * PI / (nx as f64 * bin_w);
            let fv = frequency_index(v, ny) as f64 * 2.0 * PI / (ny as f64 * bin_h);
            let denom = fu * fu + fv * fv;
            if denom.abs() < 1e-18 {
                *value = Complex::default();
            } else {
                value.re /= denom;
                value.im /= denom;
            }
        }
    }
}

/// Central difference of `potential` at `(i, j)` with periodic wraparound,
/// negated to produce the electrostatic force (force = -grad(potential)).
fn central_difference(
    potential: &[Vec<f64>],
    i: usize,
    j: usize,
    nx: usize,
    ny: usize,
    bin_w: f64,
    bin_h: f64,
) -> (f64, f64) {
    let ip = (i + 1) % nx;
    let im = (i + nx - 1) % nx;
    let jp = (j + 1) % ny;
    let jm = (j + ny - 1) % ny;
    let dphi_dx = (potential[j][ip] - potential[j][im]) / (2.0 * bin_w);
    let dphi_dy = (potential[jp][i] - potential[jm][i]) / (2.0 * bin_h);
    (-dphi_dx, -dphi_dy)
}

/// Summary statistics from a Poisson solve, used for convergence diagnostics
/// and progress reporting.
#[derive(Clone, Copy, Debug, Default)]
pub struct PoissonStats {
    /// Highest potential magnitude across all bins.
    pub max_potential: f64,
    /// Highest force magnitude across all bins.
    pub max_gradient_magnitude: f64,
    /// Mean force magnitude across all bins.
    pub avg_gradient_magnitude: f64,
}

/// Solves the Poisson equation over `grid`'s density field and writes
/// potential and force back into every bin. `grid`'s dimensions must both be
/// powers of two; if not, a [`Category::Numerical`] diagnostic is emitted to
/// `sink` and the grid's potential/force fields are left untouched (the
/// caller's Nesterov step then sees zero density force for this iteration).
pub fn solve(grid: &mut DensityGrid, sink: &DiagnosticSink) -> PoissonStats {
    let nx = grid.nx();
    let ny = grid.ny();

    if !is_valid_fft_size(nx) || !is_valid_fft_size(ny) {
        sink.emit(Diagnostic::error(
            DiagnosticCode::new(Category::Numerical, 1),
            format!(
                "density grid dimensions {nx}x{ny} are not powers of two; skipping Poisson solve for this iteration"
            ),
            Span::DUMMY,
        ));
        return PoissonStats::default();
    }

    let bin_w = grid.bin_width();
    let bin_h = grid.bin_height();

    let mut spectrum: Vec<Vec<Complex>> = (0..ny)
        .map(|j| {
            (0..nx)
                .map(|i| Complex::new(grid.bin_at(grid.core().x + (i as f64 + 0.5) * bin_w,
                                                   grid.core().y + (j as f64 + 0.5) * bin_h).density, 0.0))
                .collect()
        })
        .collect();

    fft2d(&mut spectrum, false);
    apply_poisson_filter(&mut spectrum, nx, ny, bin_w, bin_h);
    fft2d(&mut spectrum, true);

    let potential: Vec<Vec<f64>> = spectrum
        .iter()
        .map(|row| row.iter().map(|c| c.re).collect())
        .collect();

    let mut max_potential = 0.0f64;
    let mut max_grad = 0.0f64;
    let mut sum_grad = 0.0f64;
    let bins = grid.bins_mut();
    for j in 0..ny {
        for i in 0..nx {
            let idx = j * nx + i;
            let (fx, fy) = central_difference(&potential, i, j, nx, ny, bin_w, bin_h);
            bins[idx].potential = potential[j][i];
            bins[idx].force_x = fx;
            bins[idx].force_y = fy;

            max_potential = max_potential.max(potential[j][i].abs());
            let mag = (fx * fx + fy * fy).sqrt();
            max_grad = max_grad.max(mag);
            sum_grad += mag;
        }
    }

    PoissonStats {
        max_potential,
        max_gradient_magnitude: max_grad,
        avg_gradient_magnitude: sum_grad / (nx * ny) as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlsi_netlist::Rect;

    #[test]
    fn fft_roundtrip_recovers_input() {
        let mut data: Vec<Complex> = (0..8).map(|i| Complex::new(i as f64, 0.0)).collect();
        let original: Vec<f64> = data.iter().map(|c| c.re).collect();
        fft1d(&mut data, false);
        fft1d(&mut data, true);
        for c in &mut data {
            c.re /= 8.0;
            c.im /= 8.0;
        }
        for (got, want) in data.iter().zip(original.iter()) {
            assert!((got.re - want).abs() < 1e-9, "{} vs {}", got.re, want);
        }
    }

    #[test]
    fn fft_sizes_must_be_power_of_two() {
        assert!(is_valid_fft_size(2));
        assert!(is_valid_fft_size(64));
        assert!(!is_valid_fft_size(3));
        assert!(!is_valid_fft_size(0));
        assert_eq!(next_power_of_two(5), 8);
        assert_eq!(next_power_of_two(8), 8);
    }

    #[test]
    fn uniform_density_yields_zero_force() {
        let core = Rect::new(0.0, 0.0, 8.0, 8.0);
        let mut grid = DensityGrid::init(core, 8, 8);
        // uniform density: every bin exactly covered
        grid.update_density(std::iter::once(Rect::new(0.0, 0.0, 8.0, 8.0)));
        let sink = DiagnosticSink::new();
        let stats = solve(&mut grid, &sink);
        assert!(!sink.has_errors());
        assert!(stats.max_gradient_magnitude < 1e-6);
    }

    #[test]
    fn non_power_of_two_grid_emits_numerical_diagnostic() {
        let core = Rect::new(0.0, 0.0, 9.0, 9.0);
        let mut grid = DensityGrid::init(core, 9, 9);
        let sink = DiagnosticSink::new();
        let stats = solve(&mut grid, &sink);
        assert!(sink.has_errors());
        assert_eq!(stats.max_potential, 0.0);
    }

    #[test]
    fn concentrated_density_pushes_force_outward() {
        let core = Rect::new(0.0, 0.0, 8.0, 8.0);
        let mut grid = DensityGrid::init(core, 8, 8);
        // a single hot bin in the center; force at neighboring bins should
        // point away from it in at least one axis.
        grid.update_density(std::iter::once(Rect::new(3.0, 3.0, 2.0, 2.0)));
        let sink = DiagnosticSink::new();
        let stats = solve(&mut grid, &sink);
        assert!(!sink.has_errors());
        assert!(stats.max_gradient_magnitude > 0.0);
    }
}
