//! Missing value handling for derived feature columns.
//!
//! Lag and rolling warm-up rows leave gaps at the start of a column. The
//! terminal fill resolves them in a fixed order: backward fill, then forward
//! fill, then zero. The order matters: a warm-up gap takes the first real
//! value that follows it, not a constant.

/// Fill NULL values with a constant.
pub fn fill_nulls_const(values: &[Option<f64>], fill_value: f64) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(fill_value)).collect()
}

/// Fill NULL values with the last observed value (forward fill / LOCF).
pub fn fill_nulls_forward(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());
    let mut last_value: Option<f64> = None;

    for v in values {
        match v {
            Some(x) => {
                last_value = Some(*x);
                result.push(Some(*x));
            }
            None => {
                result.push(last_value);
            }
        }
    }

    result
}

/// Fill NULL values with the next observed value (backward fill / NOCB).
pub fn fill_nulls_backward(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    let mut next_value: Option<f64> = None;

    for (i, v) in values.iter().enumerate().rev() {
        match v {
            Some(x) => {
                next_value = Some(*x);
                result[i] = Some(*x);
            }
            None => {
                result[i] = next_value;
            }
        }
    }

    result
}

/// Backward fill, then forward fill, then zero for anything left.
pub fn fill_nulls_terminal(values: &[Option<f64>]) -> Vec<f64> {
    let backward = fill_nulls_backward(values);
    let forward = fill_nulls_forward(&backward);
    fill_nulls_const(&forward, 0.0)
}
