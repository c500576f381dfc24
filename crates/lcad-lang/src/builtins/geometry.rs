//! Geometry special forms and placement builtins.
//!
//! The transform forms share one control-flow pattern: parse a vector
//! argument into a 4×4 homogeneous matrix, save the model's current
//! matrix, right-multiply, evaluate the body against the updated model,
//! restore. Composition is local-space, so child transforms are relative
//! to the parent and siblings are never affected.

use glam::{DMat4, DVec3};

use crate::builtins::{int_arg, str_arg, Registry};
use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::eval::Evaluator;
use crate::runtime::model::{Model, PrimitiveKind};
use crate::runtime::signature::{BoundArgs, KwSpec, Signature};
use crate::runtime::value::{TypeSet, Value};
use crate::syntax::ast::{ExprNode, Node, Span};

pub(super) fn register(r: &mut Registry) {
    let scoped = |n: usize| Signature::Variadic {
        required: vec![TypeSet::ANY; n],
        rest: TypeSet::ANY,
    };

    r.special("rotate", scoped(1), sf_rotate);
    r.special("translate", scoped(1), sf_translate);
    r.special("scale", scoped(1), sf_scale);
    r.special("mirror", scoped(1), sf_mirror);
    r.special("transform", scoped(1), sf_transform);
    r.special("group", scoped(1), sf_group);

    r.ordinary(
        "part",
        Signature::Keyword {
            required: vec![TypeSet::STRING, TypeSet::INT],
            keys: vec![KwSpec { name: "step", types: TypeSet::INT, default: Value::NIL }],
        },
        part,
    );

    let primitive_sig = |points: usize| {
        let mut required = vec![TypeSet::INT];
        required.extend(std::iter::repeat(TypeSet::LIST).take(points));
        Signature::Fixed(required)
    };
    r.ordinary("line", primitive_sig(2), |_, m, a, s| primitive(m, a, s, PrimitiveKind::Line));
    r.ordinary("triangle", primitive_sig(3), |_, m, a, s| {
        primitive(m, a, s, PrimitiveKind::Triangle)
    });
    r.ordinary("quad", primitive_sig(4), |_, m, a, s| primitive(m, a, s, PrimitiveKind::Quad));

    r.ordinary("step", Signature::Fixed(vec![]), |_, model, _, _| {
        Ok(Value::Int(model.advance_step()))
    });
    r.ordinary("header", Signature::Fixed(vec![TypeSet::STRING]), |_, model, a, _| {
        model.add_header(str_arg(&a.positional[0]));
        Ok(Value::NIL)
    });
    r.ordinary("comment", Signature::Fixed(vec![TypeSet::STRING]), |_, model, a, _| {
        model.add_comment(str_arg(&a.positional[0]));
        Ok(Value::NIL)
    });
}

// ─── Transform forms ─────────────────────────────────────────────────────────

fn sf_rotate(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let v = vec3_argument(eval, model, e, "rotate")?;
    transform_scope(eval, model, e, rotation_xyz(v))
}

fn sf_translate(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let v = vec3_argument(eval, model, e, "translate")?;
    transform_scope(eval, model, e, DMat4::from_translation(v))
}

fn sf_scale(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let v = vec3_argument(eval, model, e, "scale")?;
    transform_scope(eval, model, e, DMat4::from_scale(v))
}

/// A nonzero component negates its axis.
fn sf_mirror(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let v = vec3_argument(eval, model, e, "mirror")?;
    let flip = |c: f64| if c != 0.0 { -1.0 } else { 1.0 };
    transform_scope(eval, model, e, DMat4::from_scale(DVec3::new(flip(v.x), flip(v.y), flip(v.z))))
}

/// Accepts a full 16-number row-major matrix, the 12-number brick-file
/// layout `[x y z a b c d e f g h i]`, or 6 numbers `[x y z rx ry rz]`
/// with degree angles.
fn sf_transform(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let value = eval.eval(&e.elements[1], model)?;
    let nums = match number_list(&value) {
        Some(nums) if matches!(nums.len(), 6 | 12 | 16) => nums,
        _ => {
            return Err(EvalError::new(
                EvalErrorKind::WrongType {
                    name: "transform".into(),
                    index: 1,
                    expected: "a list of 6, 12 or 16 numbers".into(),
                    actual: value.type_name(),
                },
                e.elements[1].span(),
            ));
        }
    };

    let matrix = match nums.len() {
        16 => mat_from_rows(&nums),
        12 => {
            // Translation first, then the row-major 3×3.
            let rows = [
                nums[3], nums[4], nums[5], nums[0],
                nums[6], nums[7], nums[8], nums[1],
                nums[9], nums[10], nums[11], nums[2],
                0.0, 0.0, 0.0, 1.0,
            ];
            mat_from_rows(&rows)
        }
        _ => {
            DMat4::from_translation(DVec3::new(nums[0], nums[1], nums[2]))
                * rotation_xyz(DVec3::new(nums[3], nums[4], nums[5]))
        }
    };
    transform_scope(eval, model, e, matrix)
}

/// Starts a fresh, uniquely named sub-assembly from the identity matrix —
/// deliberately not inheriting the enclosing transform.
fn sf_group(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let name_value = eval.eval(&e.elements[1], model)?;
    let Value::Str(name) = &name_value else {
        return Err(EvalError::new(
            EvalErrorKind::WrongType {
                name: "group".into(),
                index: 1,
                expected: "string".into(),
                actual: name_value.type_name(),
            },
            e.elements[1].span(),
        ));
    };
    let saved = model
        .open_group(name)
        .map_err(|kind| EvalError::new(kind, e.elements[1].span()))?;
    let result = eval_body(eval, model, &e.elements[2..]);
    model.close_group(saved);
    result
}

/// Save → multiply → evaluate body → restore.
fn transform_scope(
    eval: &mut Evaluator,
    model: &mut Model,
    e: &ExprNode,
    local: DMat4,
) -> Result<Value, EvalError> {
    let saved = model.push_matrix(local);
    let result = eval_body(eval, model, &e.elements[2..]);
    model.restore_matrix(saved);
    result
}

fn eval_body(
    eval: &mut Evaluator,
    model: &mut Model,
    body: &[std::rc::Rc<Node>],
) -> Result<Value, EvalError> {
    for node in body {
        eval.eval(node, model)?;
    }
    Ok(Value::NIL)
}

// ─── Placement ───────────────────────────────────────────────────────────────

/// Append one part placement to the current group. Step resolution: the
/// explicit `:step` keyword wins; otherwise the group's current step plus
/// the process-wide `step-offset` (a number, or a zero-argument function
/// called at placement time).
fn part(
    eval: &mut Evaluator,
    model: &mut Model,
    args: BoundArgs,
    span: &Span,
) -> Result<Value, EvalError> {
    let name = str_arg(&args.positional[0]).to_string();
    let color = int_arg(&args.positional[1]);
    let step = match args.keyword("step") {
        Value::Int(step) => *step,
        _ => model.current_step() + step_offset(eval, model, span)?,
    };
    model.place_part(&name, color, step);
    Ok(Value::NIL)
}

fn step_offset(eval: &mut Evaluator, model: &mut Model, span: &Span) -> Result<i64, EvalError> {
    let Some(binding) = eval.arena.lookup(eval.root, "step-offset") else {
        return Ok(0);
    };
    let value = eval.arena.get(binding.slot).cloned().unwrap_or(Value::Int(0));
    let resolved = match value {
        Value::Function(_) => eval.call_no_args(&value, model, span)?,
        other => other,
    };
    match resolved {
        Value::Int(i) => Ok(i),
        Value::Float(f) => Ok(f as i64),
        other => Err(EvalError::new(
            EvalErrorKind::WrongType {
                name: "step-offset".into(),
                index: 1,
                expected: "int or float".into(),
                actual: other.type_name(),
            },
            span,
        )),
    }
}

fn primitive(
    model: &mut Model,
    args: BoundArgs,
    span: &Span,
    kind: PrimitiveKind,
) -> Result<Value, EvalError> {
    let color = int_arg(&args.positional[0]);
    let mut points = Vec::with_capacity(kind.point_count());
    for (i, value) in args.positional[1..].iter().enumerate() {
        let Some(point) = number_list(value).filter(|nums| nums.len() == 3) else {
            return Err(EvalError::new(
                EvalErrorKind::WrongType {
                    name: format!("{kind:?}").to_lowercase(),
                    index: i + 2,
                    expected: "a list of 3 numbers".into(),
                    actual: value.type_name(),
                },
                span,
            ));
        };
        points.push(DVec3::new(point[0], point[1], point[2]));
    }
    model.place_primitive(kind, color, points);
    Ok(Value::NIL)
}

// ─── Vector / matrix parsing ─────────────────────────────────────────────────

/// Evaluate the form's first argument as a 3-vector.
fn vec3_argument(
    eval: &mut Evaluator,
    model: &mut Model,
    e: &ExprNode,
    name: &str,
) -> Result<DVec3, EvalError> {
    let value = eval.eval(&e.elements[1], model)?;
    match number_list(&value).filter(|nums| nums.len() == 3) {
        Some(nums) => Ok(DVec3::new(nums[0], nums[1], nums[2])),
        None => Err(EvalError::new(
            EvalErrorKind::WrongType {
                name: name.to_string(),
                index: 1,
                expected: "a list of 3 numbers".into(),
                actual: value.type_name(),
            },
            e.elements[1].span(),
        )),
    }
}

fn number_list(value: &Value) -> Option<Vec<f64>> {
    let Value::List(items) = value else { return None };
    items
        .iter()
        .map(|v| match v {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        })
        .collect()
}

/// Rotation about X, then Y, then Z, composed in local space. Degrees.
fn rotation_xyz(degrees: DVec3) -> DMat4 {
    DMat4::from_rotation_x(degrees.x.to_radians())
        * DMat4::from_rotation_y(degrees.y.to_radians())
        * DMat4::from_rotation_z(degrees.z.to_radians())
}

fn mat_from_rows(rows: &[f64]) -> DMat4 {
    let mut cols = [0.0; 16];
    for r in 0..4 {
        for c in 0..4 {
            cols[c * 4 + r] = rows[r * 4 + c];
        }
    }
    DMat4::from_cols_array(&cols)
}
