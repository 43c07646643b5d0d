//! Follows the graphics state of a page content stream to find where XObjects are drawn.

use lopdf::content::Operation;
use lopdf::Object;

use crate::document::BoundingBox;

/// Affine transform `[a b c d e f]` as used by the PDF `cm` operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        let mut values = [0f32; 6];
        for (slot, operand) in values.iter_mut().zip(operands) {
            *slot = number(operand)?;
        }
        let [a, b, c, d, e, f] = values;
        Some(Self { a, b, c, d, e, f })
    }

    /// Returns `self × ctm`, the new CTM after `self cm`.
    fn then(self, ctm: Matrix) -> Matrix {
        Matrix {
            a: self.a * ctm.a + self.b * ctm.c,
            b: self.a * ctm.b + self.b * ctm.d,
            c: self.c * ctm.a + self.d * ctm.c,
            d: self.c * ctm.b + self.d * ctm.d,
            e: self.e * ctm.a + self.f * ctm.c + ctm.e,
            f: self.e * ctm.b + self.f * ctm.d + ctm.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Image space is the unit square; its image under the CTM is the drawn area.
    fn unit_square_bounds(&self) -> BoundingBox {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        let mut bounds = BoundingBox {
            x0: f32::INFINITY,
            y0: f32::INFINITY,
            x1: f32::NEG_INFINITY,
            y1: f32::NEG_INFINITY,
        };
        for (x, y) in corners {
            bounds.x0 = bounds.x0.min(x);
            bounds.y0 = bounds.y0.min(y);
            bounds.x1 = bounds.x1.max(x);
            bounds.y1 = bounds.y1.max(y);
        }
        bounds
    }
}

/// One `Do` operator in content order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Placement {
    pub(crate) name: Vec<u8>,
    pub(crate) bounding_box: BoundingBox,
}

/// Walks `q`/`Q`/`cm` and records every `Do` with the area it covers.
///
/// Unbalanced `Q` operators are ignored rather than treated as errors; real-world
/// producers emit them often enough.
pub(crate) fn xobject_placements(operations: &[Operation]) -> Vec<Placement> {
    let mut ctm = Matrix::IDENTITY;
    let mut saved: Vec<Matrix> = Vec::new();
    let mut placements = Vec::new();
    for operation in operations {
        match operation.operator.as_str() {
            "q" => saved.push(ctm),
            "Q" => {
                if let Some(previous) = saved.pop() {
                    ctm = previous;
                }
            }
            "cm" => {
                if let Some(matrix) = Matrix::from_operands(&operation.operands) {
                    ctm = matrix.then(ctm);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = operation.operands.first() {
                    placements.push(Placement {
                        name: name.clone(),
                        bounding_box: ctm.unit_square_bounds(),
                    });
                }
            }
            _ => {}
        }
    }
    placements
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn cm(values: [i64; 6]) -> Operation {
        op("cm", values.iter().map(|v| Object::Integer(*v)).collect())
    }

    fn draw(name: &str) -> Operation {
        op("Do", vec![Object::Name(name.as_bytes().to_vec())])
    }

    #[test]
    fn scales_unit_square_into_page_space() {
        let ops = vec![
            op("q", vec![]),
            cm([100, 0, 0, 50, 10, 20]),
            draw("Im0"),
            op("Q", vec![]),
        ];
        let placements = xobject_placements(&ops);
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].name, b"Im0".to_vec());
        assert_eq!(
            placements[0].bounding_box,
            BoundingBox {
                x0: 10.0,
                y0: 20.0,
                x1: 110.0,
                y1: 70.0
            }
        );
    }

    #[test]
    fn nested_transforms_compose_and_restore() {
        let ops = vec![
            cm([2, 0, 0, 2, 0, 0]),
            op("q", vec![]),
            cm([10, 0, 0, 10, 5, 5]),
            draw("Im0"),
            op("Q", vec![]),
            draw("Im1"),
        ];
        let placements = xobject_placements(&ops);
        assert_eq!(placements.len(), 2);
        assert_eq!(
            placements[0].bounding_box,
            BoundingBox {
                x0: 10.0,
                y0: 10.0,
                x1: 30.0,
                y1: 30.0
            }
        );
        assert_eq!(
            placements[1].bounding_box,
            BoundingBox {
                x0: 0.0,
                y0: 0.0,
                x1: 2.0,
                y1: 2.0
            }
        );
    }

    #[test]
    fn stray_restore_keeps_current_matrix() {
        let ops = vec![op("Q", vec![]), cm([3, 0, 0, 3, 1, 1]), draw("Im0")];
        let placements = xobject_placements(&ops);
        assert_eq!(placements[0].bounding_box.x1, 4.0);
    }
}
