use ilp_common::{CResult, Error};

/// A value passed to `Buffer::array_column`. The top-level value must be
/// `Array` (a bare `Value` is rejected); nesting depth is the array's rank.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Value(f64),
    Array(Vec<ArrayElement>),
}

impl ArrayElement {
    pub fn scalar(v: f64) -> Self {
        ArrayElement::Value(v)
    }
}

impl From<Vec<f64>> for ArrayElement {
    fn from(values: Vec<f64>) -> Self {
        ArrayElement::Array(values.into_iter().map(ArrayElement::Value).collect())
    }
}

/// Validates that `value` is a regular (non-ragged), all-numeric
/// n-dimensional array, and flattens it in row-major order alongside its
/// per-level dimension lengths (spec.md §4.2.1).
pub fn validate_and_flatten(value: &ArrayElement) -> CResult<(Vec<u32>, Vec<f64>)> {
    if !matches!(value, ArrayElement::Array(_)) {
        return Err(Error::validation("array column requires an array value, not a scalar"));
    }

    let mut dims = Vec::new();
    let mut probe = value;
    loop {
        match probe {
            ArrayElement::Array(elems) => {
                dims.push(elems.len() as u32);
                match elems.first() {
                    Some(first) => probe = first,
                    None => break,
                }
            }
            ArrayElement::Value(_) => break,
        }
    }

    let mut flat = Vec::new();
    walk(value, &dims, 0, &mut flat)?;
    Ok((dims, flat))
}

fn walk(node: &ArrayElement, dims: &[u32], level: usize, out: &mut Vec<f64>) -> CResult<()> {
    if level == dims.len() {
        return match node {
            ArrayElement::Value(v) => {
                out.push(*v);
                Ok(())
            }
            ArrayElement::Array(_) => {
                Err(Error::validation("ragged array: expected a number, found a nested array"))
            }
        };
    }

    match node {
        ArrayElement::Array(elems) => {
            if elems.len() as u32 != dims[level] {
                return Err(Error::validation(format!(
                    "ragged array: expected {} elements at depth {level}, got {}",
                    dims[level],
                    elems.len()
                )));
            }
            for elem in elems {
                walk(elem, dims, level + 1, out)?;
            }
            Ok(())
        }
        ArrayElement::Value(_) => {
            Err(Error::validation("ragged array: expected a nested array, found a number"))
        }
    }
}
