// ============================================================
// Layer 5 — Parameter Shape Bookkeeping
// ============================================================
// Every trainable tensor gets a dotted name such as
// "encoder.conv1.weight" and a shape. Configs compute the
// shapes they WOULD allocate; modules report the shapes they
// actually hold. Comparing the two is how restored checkpoints
// and shared decoder parameters are validated.

use burn::{
    module::Param,
    nn::{conv::Conv2d, Linear},
    prelude::*,
};

/// (name, shape) for every trainable tensor, in layer order
pub type ParameterShapes = Vec<(String, Vec<usize>)>;

/// First disagreement between an expected and an actual parameter list.
/// An empty `found` means the parameter is missing; an empty
/// `expected` means it is unexpected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub name:     String,
    pub expected: Vec<usize>,
    pub found:    Vec<usize>,
}

pub fn param_shape<B: Backend, const D: usize>(
    name:  impl Into<String>,
    param: &Param<Tensor<B, D>>,
) -> (String, Vec<usize>) {
    (name.into(), param.val().dims().to_vec())
}

pub fn linear_shapes<B: Backend>(prefix: &str, layer: &Linear<B>) -> ParameterShapes {
    let mut shapes = vec![param_shape(format!("{prefix}.weight"), &layer.weight)];
    if let Some(bias) = &layer.bias {
        shapes.push(param_shape(format!("{prefix}.bias"), bias));
    }
    shapes
}

pub fn conv_shapes<B: Backend>(prefix: &str, layer: &Conv2d<B>) -> ParameterShapes {
    let mut shapes = vec![param_shape(format!("{prefix}.weight"), &layer.weight)];
    if let Some(bias) = &layer.bias {
        shapes.push(param_shape(format!("{prefix}.bias"), bias));
    }
    shapes
}

/// Shorthand for the (weight, bias) entries a config expects.
pub fn pair(prefix: &str, weight: Vec<usize>, bias: Vec<usize>) -> ParameterShapes {
    vec![(format!("{prefix}.weight"), weight), (format!("{prefix}.bias"), bias)]
}

pub fn prefixed(prefix: &str, shapes: ParameterShapes) -> ParameterShapes {
    shapes
        .into_iter()
        .map(|(name, shape)| (format!("{prefix}.{name}"), shape))
        .collect()
}

pub fn first_mismatch(expected: &ParameterShapes, found: &ParameterShapes) -> Option<ShapeMismatch> {
    for (name, shape) in expected {
        match found.iter().find(|(n, _)| n == name) {
            Some((_, actual)) if actual == shape => {}
            Some((_, actual)) => {
                return Some(ShapeMismatch { name: name.clone(), expected: shape.clone(), found: actual.clone() })
            }
            None => {
                return Some(ShapeMismatch { name: name.clone(), expected: shape.clone(), found: Vec::new() })
            }
        }
    }

    found
        .iter()
        .find(|(name, _)| !expected.iter().any(|(n, _)| n == name))
        .map(|(name, shape)| ShapeMismatch { name: name.clone(), expected: Vec::new(), found: shape.clone() })
}
