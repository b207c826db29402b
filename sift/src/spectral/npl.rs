//! Derivatives of the Planck occupation number `n_Pl(x) = 1/(eˣ − 1)`.
//!
//! SZ spectral shapes are linear combinations of `xᵏ dᵏn_Pl/dxᵏ`. The
//! derivatives are evaluated in closed form through Eulerian numbers,
//!
//! ```text
//! dᵏn_Pl/dxᵏ = (−1)ᵏ Σₘ A(k, m) e^{−(k−m)x} / (1 − e^{−x})^{k+1},   k ≥ 1
//! ```
//!
//! which stays finite for large `x` where the naive form overflows.

/// `1 − e^{−x}` without cancellation for small `x`.
pub fn one_minus_exp_mx(x: f64) -> f64 {
    -(-x).exp_m1()
}

/// Binomial coefficient `C(n, k)` as a float.
pub fn binomial_coeff(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * f64::from(n - i) / f64::from(i + 1))
}

/// Row `k` of the Eulerian number triangle, `A(k, 0..k)`.
fn eulerian_row(k: u32) -> Vec<f64> {
    let mut row = vec![1.0];
    for n in 1..=k {
        let mut next = vec![0.0; n as usize];
        for m in 0..n as usize {
            let keep = if m < row.len() { row[m] } else { 0.0 };
            let carry = if m > 0 { row[m - 1] } else { 0.0 };
            next[m] = (m as f64 + 1.0) * keep + (f64::from(n) - m as f64) * carry;
        }
        row = next;
    }
    row
}

/// `xᵏ dᵏn_Pl/dxᵏ` evaluated at `x > 0`.
pub fn xk_dk_npl(k: u32, x: f64) -> f64 {
    if k == 0 {
        return 1.0 / x.exp_m1();
    }

    let exp_mx = (-x).exp();
    let denominator = one_minus_exp_mx(x).powi(k as i32 + 1);
    let sum: f64 = eulerian_row(k)
        .iter()
        .enumerate()
        .map(|(m, a)| a * exp_mx.powi((k as usize - m) as i32))
        .sum();

    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
    sign * x.powi(k as i32) * sum / denominator
}

/// All derivatives `xᵏ dᵏn_Pl/dxᵏ` for `k = 0..=kmax`.
pub fn dk_npl_dks(kmax: u32, x: f64) -> Vec<f64> {
    (0..=kmax).map(|k| xk_dk_npl(k, x)).collect()
}

/// The classical SZ frequency weight `G(x) = x eˣ/(eˣ − 1)² = −x dn_Pl/dx`.
pub fn g_function(x: f64) -> f64 {
    -xk_dk_npl(1, x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_one_minus_exp_small_x() {
        assert_relative_eq!(one_minus_exp_mx(1e-12), 1e-12, max_relative = 1e-9);
        assert_relative_eq!(one_minus_exp_mx(2.0), 1.0 - (-2.0f64).exp());
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial_coeff(5, 0), 1.0);
        assert_eq!(binomial_coeff(5, 2), 10.0);
        assert_eq!(binomial_coeff(10, 7), 120.0);
        assert_eq!(binomial_coeff(3, 4), 0.0);
    }

    #[test]
    fn test_eulerian_rows() {
        assert_eq!(eulerian_row(1), vec![1.0]);
        assert_eq!(eulerian_row(2), vec![1.0, 1.0]);
        assert_eq!(eulerian_row(3), vec![1.0, 4.0, 1.0]);
        assert_eq!(eulerian_row(4), vec![1.0, 11.0, 11.0, 1.0]);
    }

    #[test]
    fn test_first_derivative_closed_form() {
        for x in [0.1_f64, 1.0, 2.5, 10.0] {
            let expected = -x * x.exp() / x.exp_m1().powi(2);
            assert_relative_eq!(xk_dk_npl(1, x), expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_second_derivative_matches_finite_difference() {
        let npl = |x: f64| 1.0 / x.exp_m1();
        for x in [0.5, 2.0, 5.0] {
            let h = 1e-4;
            let second = (npl(x + h) - 2.0 * npl(x) + npl(x - h)) / (h * h);
            assert_relative_eq!(xk_dk_npl(2, x), x * x * second, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_large_x_stays_finite() {
        for k in 0..6 {
            let value = xk_dk_npl(k, 800.0);
            assert!(value.is_finite());
        }
    }

    #[test]
    fn test_derivative_list() {
        let list = dk_npl_dks(3, 1.5);
        assert_eq!(list.len(), 4);
        assert_eq!(list[2], xk_dk_npl(2, 1.5));
        assert_relative_eq!(g_function(1.5), -list[1]);
    }
}
