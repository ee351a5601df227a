//! Assertion text for a single observed value.

use tessera_ir::literal::render_float;
use tessera_ir::runtime::ObservedValue;
use tessera_ir::typename::{erasure, PrimitiveKind};
use tessera_ir::Literal;

/// Assertion statements checking that `expr`, of static type
/// `declared_type`, evaluates to `value`.
pub fn assertion_for(expr: &str, declared_type: &str, value: &ObservedValue, tolerance: f64) -> String {
    match value {
        ObservedValue::Literal(literal) => literal_assertion(expr, declared_type, literal, tolerance),
        ObservedValue::Enum {
            type_name,
            constant,
        } => format!("assertEquals({}.{constant}, {expr});", erasure(type_name)),
        ObservedValue::Array { items, .. } => {
            format!("assertEquals({}, {expr}.length);", items.len())
        }
        ObservedValue::Object { .. } => format!("assertNotNull({expr});"),
    }
}

fn literal_assertion(expr: &str, declared_type: &str, literal: &Literal, tolerance: f64) -> String {
    match literal {
        Literal::Null => format!("assertNull({expr});"),
        Literal::Bool(true) => format!("assertTrue({expr});"),
        Literal::Bool(false) => format!("assertFalse({expr});"),
        Literal::Float(v) => {
            let single = PrimitiveKind::of(declared_type) == Some(PrimitiveKind::Float);
            format!(
                "assertEquals({}, {expr}, {});",
                render_float(*v, single),
                render_float(delta(*v, tolerance), false)
            )
        }
        other => format!("assertEquals({}, {expr});", other.render(declared_type)),
    }
}

/// Absolute delta for a relative tolerance; exact for non-finite values.
pub fn delta(expected: f64, tolerance: f64) -> f64 {
    if expected.is_finite() {
        tolerance * expected.abs().max(1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(l: Literal) -> ObservedValue {
        ObservedValue::Literal(l)
    }

    #[test]
    fn test_integral_and_text_values() {
        assert_eq!(
            assertion_for("v1", "long", &lit(Literal::Int(3)), 1e-6),
            "assertEquals(3L, v1);"
        );
        assert_eq!(
            assertion_for("s", "java.lang.String", &lit(Literal::Str("a\"b".into())), 1e-6),
            "assertEquals(\"a\\\"b\", s);"
        );
        assert_eq!(
            assertion_for("c", "char", &lit(Literal::Char('\n')), 1e-6),
            "assertEquals('\\n', c);"
        );
        assert_eq!(
            assertion_for("b", "boolean", &lit(Literal::Bool(false)), 1e-6),
            "assertFalse(b);"
        );
    }

    #[test]
    fn test_null_uses_dedicated_check() {
        assert_eq!(
            assertion_for("w.name", "java.lang.String", &lit(Literal::Null), 1e-6),
            "assertNull(w.name);"
        );
    }

    #[test]
    fn test_floating_values_use_tolerance() {
        assert_eq!(
            assertion_for("d", "double", &lit(Literal::Float(f64::NAN)), 1e-6),
            "assertEquals(Double.NaN, d, 0.0);"
        );
        assert_eq!(
            assertion_for("f", "float", &lit(Literal::Float(f64::NEG_INFINITY)), 1e-6),
            "assertEquals(Float.NEGATIVE_INFINITY, f, 0.0);"
        );
        assert_eq!(delta(2000.0, 1e-6), 2000.0 * 1e-6);
        assert_eq!(delta(0.5, 1e-6), 1e-6);
    }

    #[test]
    fn test_compound_values() {
        let e = ObservedValue::Enum {
            type_name: "com.acme.Color".into(),
            constant: "RED".into(),
        };
        assert_eq!(assertion_for("k", "com.acme.Color", &e, 1e-6), "assertEquals(com.acme.Color.RED, k);");
        let a = ObservedValue::Array {
            element: "int".into(),
            items: vec![lit(Literal::Int(1)), lit(Literal::Int(2))],
        };
        assert_eq!(assertion_for("xs", "int[]", &a, 1e-6), "assertEquals(2, xs.length);");
    }
}
