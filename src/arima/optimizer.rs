/// Derivative-free Nelder-Mead simplex minimiser.
///
/// Convergence uses the relative spread of function values across the simplex:
/// `f_worst - f_best <= rel_tol * (|f_best| + rel_tol)`. Non-finite objective
/// values are treated as `+inf`.
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    pub rel_tol: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 5_000,
            rel_tol: 1e-8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub f: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

pub fn minimize<F>(mut f: F, x0: &[f64], steps: &[f64], cfg: NelderMeadConfig) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    let mut eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let n = x0.len();
    if n == 0 {
        let fx = eval(x0);
        return Minimum {
            x: Vec::new(),
            f: fx,
            iterations: 0,
            converged: fx.is_finite(),
        };
    }

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((x0.to_vec(), eval(x0)));
    for i in 0..n {
        let mut x = x0.to_vec();
        let step = steps.get(i).copied().unwrap_or(0.1);
        x[i] += if step.abs() > 0.0 { step } else { 0.1 };
        let fx = eval(&x);
        simplex.push((x, fx));
    }

    let mut iterations = 0;
    let mut converged = false;
    while iterations < cfg.max_iter {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let f_best = simplex[0].1;
        let f_worst = simplex[n].1;
        if f_best.is_finite()
            && f_worst.is_finite()
            && f_worst - f_best <= cfg.rel_tol * (f_best.abs() + cfg.rel_tol)
        {
            converged = true;
            break;
        }
        iterations += 1;

        let mut centroid = vec![0.0; n];
        for (x, _) in simplex.iter().take(n) {
            for (c, xi) in centroid.iter_mut().zip(x) {
                *c += xi / n as f64;
            }
        }
        let worst = simplex[n].0.clone();
        let f_second = simplex[n - 1].1;

        let reflected = towards(&centroid, &worst, -REFLECT);
        let f_reflected = eval(&reflected);

        if f_reflected < f_best {
            let expanded = towards(&centroid, &reflected, EXPAND);
            let f_expanded = eval(&expanded);
            simplex[n] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }
        if f_reflected < f_second {
            simplex[n] = (reflected, f_reflected);
            continue;
        }

        let (contracted, f_contracted, accept) = if f_reflected < f_worst {
            let xc = towards(&centroid, &reflected, CONTRACT);
            let fc = eval(&xc);
            let ok = fc <= f_reflected;
            (xc, fc, ok)
        } else {
            let xc = towards(&centroid, &worst, CONTRACT);
            let fc = eval(&xc);
            let ok = fc < f_worst;
            (xc, fc, ok)
        };
        if accept {
            simplex[n] = (contracted, f_contracted);
            continue;
        }

        let best = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let shrunk = towards(&best, &vertex.0, SHRINK);
            let fs = eval(&shrunk);
            *vertex = (shrunk, fs);
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (x, f) = simplex.swap_remove(0);
    Minimum {
        x,
        f,
        iterations,
        converged,
    }
}

/// `origin + t * (target - origin)`.
fn towards(origin: &[f64], target: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target)
        .map(|(o, x)| o + t * (x - o))
        .collect()
}
