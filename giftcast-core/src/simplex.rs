//! Derivative-free minimizer (Nelder-Mead simplex) used to fit smoothing
//! parameters.

/// Outcome of a minimization run
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

/// Nelder-Mead settings
#[derive(Debug, Clone, Copy)]
pub struct Simplex {
    pub max_iterations: usize,
    /// Stop once the spread of objective values across the simplex falls below this
    pub tolerance: f64,
    /// Initial edge length along each axis
    pub step: f64,
}

impl Default for Simplex {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            tolerance: 1e-10,
            step: 0.5,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl Simplex {
    /// Minimize `f` starting from `start`. Non-finite objective values are
    /// treated as +inf, so the simplex walks away from them.
    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let dim = start.len();
        let eval = |x: &[f64]| {
            let v = f(x);
            if v.is_finite() { v } else { f64::INFINITY }
        };

        let mut vertices: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
        vertices.push((start.to_vec(), eval(start)));
        for axis in 0..dim {
            let mut x = start.to_vec();
            x[axis] += self.step;
            let fx = eval(&x);
            vertices.push((x, fx));
        }

        let mut iterations = 0;
        while iterations < self.max_iterations {
            iterations += 1;
            vertices.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = vertices[0].1;
            let worst = vertices[dim].1;
            if best.is_finite() && worst.is_finite() && (worst - best).abs() <= self.tolerance * (1.0 + best.abs()) {
                break;
            }

            let centroid: Vec<f64> = (0..dim)
                .map(|j| vertices[..dim].iter().map(|(x, _)| x[j]).sum::<f64>() / dim as f64)
                .collect();
            let toward = |coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&vertices[dim].0)
                    .map(|(c, w)| c + coef * (c - w))
                    .collect()
            };

            let reflected = toward(REFLECT);
            let f_reflected = eval(&reflected);

            if f_reflected < vertices[0].1 {
                let expanded = toward(EXPAND);
                let f_expanded = eval(&expanded);
                vertices[dim] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }

            if f_reflected < vertices[dim - 1].1 {
                vertices[dim] = (reflected, f_reflected);
                continue;
            }

            let contracted = if f_reflected < vertices[dim].1 {
                toward(CONTRACT)
            } else {
                toward(-CONTRACT)
            };
            let f_contracted = eval(&contracted);
            if f_contracted < vertices[dim].1.min(f_reflected) {
                vertices[dim] = (contracted, f_contracted);
                continue;
            }

            let anchor = vertices[0].0.clone();
            for (x, fx) in vertices.iter_mut().skip(1) {
                for (xi, ai) in x.iter_mut().zip(&anchor) {
                    *xi = ai + SHRINK * (*xi - ai);
                }
                *fx = eval(x);
            }
        }

        vertices.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (point, value) = vertices.swap_remove(0);
        Minimum {
            point,
            value,
            iterations,
        }
    }
}
