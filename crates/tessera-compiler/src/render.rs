//! Rendering of IR sequences back into source statements.
//!
//! Output is fully qualified, one IR statement per line, and parses back
//! into a sequence with the same statement count and signatures.

use tessera_ir::typename::{erasure, substitute_type_variables};
use tessera_ir::{Operation, Sequence, Statement};

const WITNESS: &str = "java.lang.Object";

/// Render the whole sequence, one statement per line.
pub fn render(seq: &Sequence) -> String {
    let mut out = String::new();
    for line in render_lines(seq) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// One rendered line per IR statement, in order.
pub fn render_lines(seq: &Sequence) -> Vec<String> {
    let names = seq.variable_names();
    seq.statements()
        .iter()
        .enumerate()
        .map(|(i, stmt)| render_statement(stmt, &names[i], &names))
        .collect()
}

/// Source type for a variable declaration.
pub fn declared_type(type_name: &str) -> String {
    substitute_type_variables(type_name, WITNESS)
}

fn render_statement(stmt: &Statement, name: &str, names: &[String]) -> String {
    let arg = |k: usize| -> &str { stmt.inputs.get(k).map_or("null", |&i| names[i].as_str()) };
    let args_from = |start: usize| -> String {
        stmt.inputs[start.min(stmt.inputs.len())..]
            .iter()
            .map(|&i| names[i].as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let expr = match &stmt.operation {
        Operation::Constructor { declaring, .. } => {
            format!("new {}({})", declared_type(declaring), args_from(0))
        }
        Operation::Method {
            declaring,
            name: method,
            is_static,
            ..
        } => {
            if *is_static {
                format!("{}.{method}({})", erasure(declaring), args_from(0))
            } else {
                format!("{}.{method}({})", arg(0), args_from(1))
            }
        }
        Operation::FieldGet {
            declaring,
            field,
            is_static,
            ..
        } => {
            if *is_static {
                format!("{}.{field}", erasure(declaring))
            } else {
                format!("{}.{field}", arg(0))
            }
        }
        Operation::FieldSet {
            declaring,
            field,
            is_static,
            ..
        } => {
            return if *is_static {
                format!("{}.{field} = {};", erasure(declaring), arg(0))
            } else {
                format!("{}.{field} = {};", arg(0), arg(1))
            };
        }
        Operation::Literal { type_name, value } => value.render(type_name),
        Operation::ArrayCreate { element, length } => {
            if stmt.inputs.is_empty() {
                format!("new {}[{length}]", erasure(element))
            } else {
                format!("new {}[]{{{}}}", erasure(element), args_from(0))
            }
        }
    };

    match stmt.output_type() {
        Some(t) => format!("{} {name} = {expr};", declared_type(&t)),
        None => format!("{expr};"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ir::Literal;

    #[test]
    fn test_render_simple_sequence() {
        let mut seq = Sequence::new();
        let c = seq
            .push_labeled(
                Operation::Constructor {
                    declaring: "com.acme.Counter".into(),
                    params: vec![],
                },
                vec![],
                Some("counter".into()),
            )
            .unwrap();
        let n = seq
            .push(
                Operation::Literal {
                    type_name: "long".into(),
                    value: Literal::Int(3),
                },
                vec![],
            )
            .unwrap();
        seq.push(
            Operation::Method {
                declaring: "com.acme.Counter".into(),
                name: "add".into(),
                params: vec!["long".into()],
                returns: "void".into(),
                is_static: false,
            },
            vec![c, n],
        )
        .unwrap();

        assert_eq!(
            render(&seq),
            "com.acme.Counter counter = new com.acme.Counter();\nlong v1 = 3L;\ncounter.add(v1);\n"
        );
    }

    #[test]
    fn test_render_arrays_and_type_variables() {
        let mut seq = Sequence::new();
        let e = seq
            .push(
                Operation::Literal {
                    type_name: "java.lang.String".into(),
                    value: Literal::Str("a\"b".into()),
                },
                vec![],
            )
            .unwrap();
        seq.push(
            Operation::ArrayCreate {
                element: "java.util.List<T>".into(),
                length: 0,
            },
            vec![],
        )
        .unwrap();
        seq.push(
            Operation::ArrayCreate {
                element: "java.lang.String".into(),
                length: 1,
            },
            vec![e],
        )
        .unwrap();

        let lines = render_lines(&seq);
        assert_eq!(lines[0], "java.lang.String v0 = \"a\\\"b\";");
        assert_eq!(lines[1], "java.util.List<java.lang.Object>[] v1 = new java.util.List[0];");
        assert_eq!(lines[2], "java.lang.String[] v2 = new java.lang.String[]{v0};");
    }

    #[test]
    fn test_render_static_field_set() {
        let mut seq = Sequence::new();
        let v = seq
            .push(
                Operation::Literal {
                    type_name: "int".into(),
                    value: Literal::Int(7),
                },
                vec![],
            )
            .unwrap();
        seq.push(
            Operation::FieldSet {
                declaring: "com.acme.Config".into(),
                field: "LIMIT".into(),
                field_type: "int".into(),
                is_static: true,
            },
            vec![v],
        )
        .unwrap();
        assert_eq!(render_lines(&seq)[1], "com.acme.Config.LIMIT = v0;");
    }
}
