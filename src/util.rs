/// Checks that a numerical value lies in the provided interval and returns early
/// with [`Error::OutOfRange`](crate::Error::OutOfRange) if not
///
/// ### Example
/// ```ignore
/// ensure_interval!(alpha, 0.0 < _ <= 1.0);
/// ensure_interval!(gamma, 0.0 < _ < 1.0);
/// ensure_interval!(epsilon, 0.0 <= _ <= 1.0);
/// ```
#[macro_export]
macro_rules! ensure_interval {
    (@check $var:expr, $ok:expr, $interval:expr) => {
        if !($ok) {
            return Err($crate::Error::OutOfRange {
                name: stringify!($var),
                value: $var as f64,
                interval: $interval,
            });
        }
    };
    ($var:expr, $a:literal < _ < $b:literal) => {
        $crate::ensure_interval!(@check $var, $var > $a && $var < $b, format!("({}, {})", $a, $b))
    };
    ($var:expr, $a:literal < _ <= $b:literal) => {
        $crate::ensure_interval!(@check $var, $var > $a && $var <= $b, format!("({}, {}]", $a, $b))
    };
    ($var:expr, $a:literal <= _ <= $b:literal) => {
        $crate::ensure_interval!(@check $var, $var >= $a && $var <= $b, format!("[{}, {}]", $a, $b))
    };
}

/// Returns early with [`Error::NonPositive`](crate::Error::NonPositive) unless `value > 0`
#[macro_export]
macro_rules! ensure_positive {
    ($var:expr) => {
        if !($var > Default::default()) {
            return Err($crate::Error::NonPositive {
                name: stringify!($var),
                value: $var as f64,
            });
        }
    };
}

/// Index of the largest value, ties broken by the lowest index
///
/// Returns `None` for an empty slice.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
