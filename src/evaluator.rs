use crate::ast::{
    BlockStatement, Expression, HashLiteral, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::object::{
    builtins, identical, Env, Environment, EvalError, EvalResult, HashPair, Object,
};
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::trace;

/// Anything that stops a sequence of statements early.
enum Signal {
    Return(Rc<Object>),
    Error(EvalError),
}

impl From<EvalError> for Signal {
    fn from(err: EvalError) -> Self {
        Signal::Error(err)
    }
}

type Flow = std::result::Result<Rc<Object>, Signal>;

/// Evaluates `program` against `env`, returning the value of the last statement evaluated. A
/// runtime error is returned as an `Object::Error` value.
pub fn eval(program: &Program, env: &Env) -> Rc<Object> {
    match eval_statements(&program.statements, env) {
        Ok(obj) | Err(Signal::Return(obj)) => obj,
        Err(Signal::Error(err)) => Rc::new(Object::Error(err.to_string())),
    }
}

fn eval_statements(statements: &[Statement], env: &Env) -> Flow {
    let mut res = Object::null();

    for statement in statements {
        res = eval_statement(statement, env)?;
    }

    Ok(res)
}

fn eval_block_statement(block: &BlockStatement, env: &Env) -> Flow {
    eval_statements(&block.statements, env)
}

fn eval_statement(statement: &Statement, env: &Env) -> Flow {
    match statement {
        Statement::Expression(exp) => eval_expression(exp, env),
        Statement::Let(name, exp) => {
            let value = eval_expression(exp, env)?;
            env.borrow_mut().set(name, value);
            Ok(Object::null())
        }
        Statement::Return(exp) => {
            let value = eval_expression(exp, env)?;
            Err(Signal::Return(value))
        }
    }
}

fn eval_expression(expression: &Expression, env: &Env) -> Flow {
    match expression {
        Expression::IntegerLiteral(v) => Ok(Rc::new(Object::Integer(*v))),
        Expression::StringLiteral(s) => Ok(Rc::new(Object::String(s.clone()))),
        Expression::Boolean(b) => Ok(Object::boolean(*b)),
        Expression::Identifier(name) => Ok(eval_identifier(name, env)?),
        Expression::Prefix(operator, right) => {
            let right = eval_expression(right, env)?;
            Ok(eval_prefix_expression(operator, right)?)
        }
        Expression::Infix(operator, left, right) => {
            let left = eval_expression(left, env)?;
            let right = eval_expression(right, env)?;
            Ok(eval_infix_expression(*operator, left, right)?)
        }
        Expression::If(condition, consequence, alternative) => {
            let condition = eval_expression(condition, env)?;

            if condition.is_truthy() {
                eval_block_statement(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block_statement(alternative, env)
            } else {
                Ok(Object::null())
            }
        }
        Expression::FunctionLiteral(function) => Ok(Rc::new(Object::Function(
            Rc::clone(function),
            Rc::clone(env),
        ))),
        Expression::Call(function, arguments) => {
            let function = eval_expression(function, env)?;
            let arguments = eval_expressions(arguments, env)?;
            apply_function(function, arguments)
        }
        Expression::ArrayLiteral(elements) => {
            Ok(Rc::new(Object::Array(eval_expressions(elements, env)?)))
        }
        Expression::IndexExpression(left, index) => {
            let left = eval_expression(left, env)?;
            let index = eval_expression(index, env)?;
            Ok(eval_index_expression(left, index)?)
        }
        Expression::HashLiteral(hash) => eval_hash_literal(hash, env),
    }
}

/// Evaluates left to right, stopping at the first error.
fn eval_expressions(expressions: &[Expression], env: &Env) -> Result<Vec<Rc<Object>>, Signal> {
    expressions
        .iter()
        .map(|exp| eval_expression(exp, env))
        .collect()
}

fn eval_identifier(name: &str, env: &Env) -> EvalResult {
    if let Some(obj) = env.borrow().get(name) {
        return Ok(obj);
    }

    builtins::lookup(name).ok_or_else(|| EvalError::IdentifierNotFound(name.to_string()))
}

fn eval_prefix_expression(operator: &PrefixOperator, right: Rc<Object>) -> EvalResult {
    match operator {
        PrefixOperator::Bang => Ok(Object::boolean(!right.is_truthy())),
        PrefixOperator::Minus => match right.as_ref() {
            Object::Integer(v) => Ok(Rc::new(Object::Integer(v.wrapping_neg()))),
            other => Err(EvalError::UnknownPrefixOperator(
                operator.clone(),
                other.type_name(),
            )),
        },
    }
}

fn eval_infix_expression(
    operator: InfixOperator,
    left: Rc<Object>,
    right: Rc<Object>,
) -> EvalResult {
    match (left.as_ref(), right.as_ref()) {
        (Object::Integer(l), Object::Integer(r)) => eval_integer_infix_expression(operator, *l, *r),
        (Object::String(l), Object::String(r)) => match operator {
            InfixOperator::Plus => Ok(Rc::new(Object::String(format!("{}{}", l, r)))),
            _ => Err(EvalError::UnknownInfixOperator(operator, "STRING", "STRING")),
        },
        _ => match operator {
            InfixOperator::Eq => Ok(Object::boolean(identical(&left, &right))),
            InfixOperator::NotEq => Ok(Object::boolean(!identical(&left, &right))),
            _ if left.type_name() != right.type_name() => Err(EvalError::TypeMismatch(
                operator,
                left.type_name(),
                right.type_name(),
            )),
            _ => Err(EvalError::UnknownInfixOperator(
                operator,
                left.type_name(),
                right.type_name(),
            )),
        },
    }
}

fn eval_integer_infix_expression(operator: InfixOperator, l: i64, r: i64) -> EvalResult {
    let integer = |v: i64| -> EvalResult { Ok(Rc::new(Object::Integer(v))) };

    match operator {
        InfixOperator::Plus => integer(l.wrapping_add(r)),
        InfixOperator::Minus => integer(l.wrapping_sub(r)),
        InfixOperator::Asterisk => integer(l.wrapping_mul(r)),
        InfixOperator::Slash => match r {
            0 => Err(EvalError::DivisionByZero),
            _ => integer(l.wrapping_div(r)),
        },
        InfixOperator::Lt => Ok(Object::boolean(l < r)),
        InfixOperator::Gt => Ok(Object::boolean(l > r)),
        InfixOperator::Eq => Ok(Object::boolean(l == r)),
        InfixOperator::NotEq => Ok(Object::boolean(l != r)),
    }
}

fn eval_index_expression(left: Rc<Object>, index: Rc<Object>) -> EvalResult {
    match (left.as_ref(), index.as_ref()) {
        (Object::Array(elements), Object::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or_else(Object::null)),
        (Object::Hash(pairs), key) => {
            let hash_key = key
                .hash_key()
                .ok_or_else(|| EvalError::UnusableHashKey(key.type_name()))?;

            Ok(pairs
                .get(&hash_key)
                .map(|pair| Rc::clone(&pair.value))
                .unwrap_or_else(Object::null))
        }
        (other, _) => Err(EvalError::IndexNotSupported(other.type_name())),
    }
}

fn eval_hash_literal(hash: &HashLiteral, env: &Env) -> Flow {
    let mut pairs = IndexMap::with_capacity(hash.pairs.len());

    for (key_exp, value_exp) in &hash.pairs {
        let key = eval_expression(key_exp, env)?;
        let hash_key = key
            .hash_key()
            .ok_or_else(|| EvalError::UnusableHashKey(key.type_name()))?;

        let value = eval_expression(value_exp, env)?;
        pairs.insert(hash_key, HashPair { key, value });
    }

    Ok(Rc::new(Object::Hash(pairs)))
}

fn apply_function(function: Rc<Object>, arguments: Vec<Rc<Object>>) -> Flow {
    match function.as_ref() {
        Object::Function(literal, captured) => {
            trace!(
                parameters = literal.parameters.len(),
                arguments = arguments.len(),
                "calling function"
            );

            if literal.parameters.len() != arguments.len() {
                return Err(EvalError::WrongArgumentCount {
                    got: arguments.len(),
                    want: literal.parameters.len(),
                }
                .into());
            }

            let extended = Environment::extend(captured);
            {
                let mut scope = extended.borrow_mut();
                for (parameter, argument) in literal.parameters.iter().zip(arguments) {
                    scope.set(parameter, argument);
                }
            }

            match eval_block_statement(&literal.body, &extended) {
                Err(Signal::Return(value)) => Ok(value),
                other => other,
            }
        }
        Object::Builtin(name, builtin) => {
            trace!(name = *name, arguments = arguments.len(), "calling builtin");
            Ok(builtin(arguments)?)
        }
        other => Err(EvalError::NotAFunction(other.type_name()).into()),
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluator;
    use crate::lexer::Lexer;
    use crate::object::{Environment, Object};
    use crate::parser::Parser;
    use std::rc::Rc;

    fn eval_input(input: &str) -> Rc<Object> {
        let lexer = Lexer::new(input);
        let mut parser = Parser::new(lexer);

        let program = parser.parse_program();
        assert!(
            parser.errors().is_empty(),
            "parser errors for `{}`: {:?}",
            input,
            parser.errors()
        );

        let env = Environment::new_shared();
        evaluator::eval(&program, &env)
    }

    fn expect_values(tests: Vec<(&str, &str)>) {
        for (input, expected) in &tests {
            let obj = eval_input(input);
            assert!(
                !obj.is_error(),
                "expected `{}`, but got {} for `{}`",
                expected,
                obj,
                input
            );
            assert_eq!(obj.to_string(), expected.to_string(), "for `{}`", input);
        }
    }

    fn expect_errors(tests: Vec<(&str, &str)>) {
        for (input, expected) in &tests {
            match eval_input(input).as_ref() {
                Object::Error(message) => assert_eq!(message, expected, "for `{}`", input),
                obj => panic!("expected error `{}`, got {} for `{}`", expected, obj, input),
            }
        }
    }

    #[test]
    fn eval_integer_expression() {
        expect_values(vec![
            ("5", "5"),
            ("10", "10"),
            ("-5", "-5"),
            ("-10", "-10"),
            ("5 + 5 + 5 + 5 - 10", "10"),
            ("2 * 2 * 2 * 2 * 2", "32"),
            ("-50 + 100 + -50", "0"),
            ("5 * 2 + 10", "20"),
            ("5 + 2 * 10", "25"),
            ("1 + 2 * 3", "7"),
            ("20 + 2 * -10", "0"),
            ("50 / 2 * 2 + 10", "60"),
            ("2 * (5 + 10)", "30"),
            ("3 * 3 * 3 + 10", "37"),
            ("3 * (3 * 3) + 10", "37"),
            ("(5 + 10 * 2 + 15 / 3) * 2 + -10", "50"),
            ("7 / 2", "3"),
            ("-7 / 2", "-3"),
        ]);
    }

    #[test]
    fn integer_arithmetic_wraps() {
        expect_values(vec![
            ("9223372036854775807 + 1", "-9223372036854775808"),
            ("-9223372036854775807 - 2", "9223372036854775807"),
        ]);
    }

    #[test]
    fn eval_boolean_expression() {
        expect_values(vec![
            ("true", "true"),
            ("false", "false"),
            ("1 < 2", "true"),
            ("1 > 2", "false"),
            ("1 < 1", "false"),
            ("1 > 1", "false"),
            ("1 == 1", "true"),
            ("1 != 1", "false"),
            ("1 == 2", "false"),
            ("1 != 2", "true"),
            ("true == true", "true"),
            ("false == false", "true"),
            ("true == false", "false"),
            ("true != false", "true"),
            ("false != true", "true"),
            ("(1 < 2) == true", "true"),
            ("(1 < 2) == false", "false"),
            ("(1 > 2) == true", "false"),
            ("(1 > 2) == false", "true"),
            ("5 > 4 == 3 < 4", "true"),
        ]);
    }

    #[test]
    fn equality_outside_integers_is_identity() {
        expect_values(vec![
            ("1 == true", "false"),
            ("1 != true", "true"),
            ("if (false) { 1 } == if (false) { 2 }", "true"),
            ("[1] == [1]", "false"),
            ("let a = [1]; a == a", "true"),
            ("let f = fn() { 1 }; f == f", "true"),
            ("fn() { 1 } == fn() { 1 }", "false"),
            ("len == len", "true"),
            ("let f = len; f == len", "true"),
            ("first != first", "false"),
            ("len == first", "false"),
        ]);
    }

    #[test]
    fn eval_bang_expression() {
        expect_values(vec![
            ("!true", "false"),
            ("!false", "true"),
            ("!5", "false"),
            ("!0", "false"),
            ("!!true", "true"),
            ("!!false", "false"),
            ("!!5", "true"),
            ("!if (false) { 1 }", "true"),
        ]);
    }

    #[test]
    fn if_else_expressions() {
        expect_values(vec![
            ("if (true) { 10 }", "10"),
            ("if (false) { 10 }", "null"),
            ("if (1) { 10 }", "10"),
            ("if (0) { 10 }", "10"),
            ("if (1 < 2) { 10 }", "10"),
            ("if (1 > 2) { 10 }", "null"),
            ("if (1 > 2) { 10 } else { 20 }", "20"),
            ("if (1 < 2) { 10 } else { 20 }", "10"),
        ]);
    }

    #[test]
    fn return_statements() {
        expect_values(vec![
            ("return 10;", "10"),
            ("return 10; 9;", "10"),
            ("return 2 * 5; 9;", "10"),
            ("9; return 2 * 5; 9;", "10"),
            (
                "if (10 > 1) { if (10 > 1) { return 10; } 129; return 1; }",
                "10",
            ),
            (
                "let f = fn(x) { if (x > 0) { return 1; } return 0; }; f(5)",
                "1",
            ),
            (
                "let f = fn(x) { if (x > 0) { return 1; } return 0; }; f(-1)",
                "0",
            ),
            (
                "let f = fn() { if (true) { if (true) { return 10; } 129; return 1; } }; f()",
                "10",
            ),
            ("let f = fn() { return 1; 2 }; f() + 1", "2"),
        ]);
    }

    #[test]
    fn error_handling() {
        expect_errors(vec![
            ("5 + true;", "type mismatch: INTEGER + BOOLEAN"),
            ("5 + true; 5;", "type mismatch: INTEGER + BOOLEAN"),
            ("-true", "unknown operator: -BOOLEAN"),
            ("true + false;", "unknown operator: BOOLEAN + BOOLEAN"),
            ("5; true + false; 5", "unknown operator: BOOLEAN + BOOLEAN"),
            (
                "if (10 > 1) { true + false; }",
                "unknown operator: BOOLEAN + BOOLEAN",
            ),
            (
                "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
                "unknown operator: BOOLEAN + BOOLEAN",
            ),
            ("foobar", "identifier not found: foobar"),
            (r#""Hello" - "World""#, "unknown operator: STRING - STRING"),
            (r#""a" == "a""#, "unknown operator: STRING == STRING"),
            (r#""a" + 1"#, "type mismatch: STRING + INTEGER"),
            (
                r#"{"name": "Monkey"}[fn(x) { x }];"#,
                "unusable as hash key: FUNCTION",
            ),
            ("{[1]: 2}", "unusable as hash key: ARRAY"),
            ("1[0]", "index operator not supported: INTEGER"),
            ("5 / 0", "division by zero"),
            ("5()", "not a function: INTEGER"),
            ("let x = -true; 5", "unknown operator: -BOOLEAN"),
            ("[1, -true, 3]", "unknown operator: -BOOLEAN"),
            ("len(1, -true)", "unknown operator: -BOOLEAN"),
            ("if (-true) { 1 }", "unknown operator: -BOOLEAN"),
        ]);
    }

    #[test]
    fn let_statements() {
        expect_values(vec![
            ("let a = 5; a;", "5"),
            ("let a = 5 * 5; a;", "25"),
            ("let a = 5; let b = a; b;", "5"),
            ("let a = 5; let b = a; let c = a + b + 5; c;", "15"),
            ("let a = 5;", "null"),
        ]);
    }

    #[test]
    fn let_shadows_inside_functions() {
        expect_values(vec![
            ("let x = 1; let f = fn() { let x = 2; x }; f() + x", "3"),
            ("let x = 1; let f = fn(x) { x }; f(10); x", "1"),
        ]);
    }

    #[test]
    fn function_object() {
        let obj = eval_input("fn(x) { x + 2; };");

        match obj.as_ref() {
            Object::Function(function, _) => {
                assert_eq!(vec!["x".to_string()], function.parameters);
                assert_eq!("(x + 2)", function.body.to_string());
            }
            other => panic!("expected a function, got {}", other),
        }
        assert_eq!("fn(x) {\n(x + 2)\n}", obj.to_string());
    }

    #[test]
    fn function_application() {
        expect_values(vec![
            ("let identity = fn(x) { x; }; identity(5);", "5"),
            ("let identity = fn(x) { return x; }; identity(5);", "5"),
            ("let double = fn(x) { x * 2; }; double(5);", "10"),
            ("let add = fn(x, y) { x + y; }; add(5, 5);", "10"),
            ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", "20"),
            ("fn(x) { x; }(5)", "5"),
            ("fn() { }()", "null"),
        ]);
    }

    #[test]
    fn argument_count_must_match_parameters() {
        expect_errors(vec![
            (
                "let add = fn(x, y) { x + y; }; add(1);",
                "wrong number of arguments. got=1, want=2",
            ),
            ("fn() { 1 }(1, 2)", "wrong number of arguments. got=2, want=0"),
        ]);
    }

    #[test]
    fn closures() {
        expect_values(vec![
            (
                "let addx = fn(x) { fn(y) { x + y } }; let add5 = addx(5); add5(3)",
                "8",
            ),
            (
                "let newAdder = fn(x) { fn(y) { x + y }; }; let addTwo = newAdder(2); addTwo(2);",
                "4",
            ),
            (
                "let f = fn() { let a = 1; fn() { fn() { a } } }; f()()()",
                "1",
            ),
        ]);
    }

    #[test]
    fn closures_see_later_bindings_in_their_scope() {
        expect_values(vec![("let f = fn() { later }; let later = 7; f()", "7")]);
    }

    #[test]
    fn recursive_functions() {
        expect_values(vec![(
            "let fib = fn(x) { if (x < 2) { x } else { fib(x - 1) + fib(x - 2) } }; fib(15)",
            "610",
        )]);
    }

    #[test]
    fn string_literal_and_concatenation() {
        expect_values(vec![
            (r#""Hello World!""#, "Hello World!"),
            (r#""Hello" + " " + "World!""#, "Hello World!"),
        ]);
    }

    #[test]
    fn builtin_functions() {
        expect_values(vec![
            (r#"len("")"#, "0"),
            (r#"len("four")"#, "4"),
            (r#"len("hello world")"#, "11"),
            ("len([1, 2, 3])", "3"),
            ("len([])", "0"),
            ("first([1, 2, 3])", "1"),
            ("first([])", "null"),
            ("last([1, 2, 3])", "3"),
            ("last([])", "null"),
            ("tail([1, 2, 3])", "[2, 3]"),
            ("tail([1])", "[]"),
            ("tail([])", "null"),
            ("push([], 1)", "[1]"),
            ("let a = [1, 2, 3]; push(a, 4)", "[1, 2, 3, 4]"),
            ("let a = [1, 2, 3]; push(a, 4); a", "[1, 2, 3]"),
            ("let len = fn(x) { 42 }; len([])", "42"),
        ]);

        expect_errors(vec![
            ("len(1)", "argument to `len` not supported, got INTEGER"),
            (
                r#"len("one", "two")"#,
                "wrong number of arguments. got=2, want=1",
            ),
            ("first(1)", "argument to `first` must be ARRAY, got INTEGER"),
            ("last(1)", "argument to `last` must be ARRAY, got INTEGER"),
            ("push(1, 1)", "argument to `push` must be ARRAY, got INTEGER"),
            ("tail()", "wrong number of arguments. got=0, want=1"),
        ]);
    }

    #[test]
    fn array_literals() {
        expect_values(vec![("[1, 2 * 2, 3 + 3]", "[1, 4, 6]"), ("[]", "[]")]);
    }

    #[test]
    fn array_index_expressions() {
        expect_values(vec![
            ("[1, 2, 3][0]", "1"),
            ("[1, 2, 3][1]", "2"),
            ("[1, 2, 3][2]", "3"),
            ("let i = 0; [1][i];", "1"),
            ("[1, 2, 3][1 + 1];", "3"),
            ("let myArray = [1, 2, 3]; myArray[2];", "3"),
            (
                "let myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];",
                "6",
            ),
            ("let myArray = [1, 2, 3]; let i = myArray[0]; myArray[i]", "2"),
            ("[1, 2, 3][3]", "null"),
            ("[1, 2, 3][-1]", "null"),
        ]);
    }

    #[test]
    fn hash_literals() {
        expect_values(vec![(
            r#"let two = "two";
{
    "one": 10 - 9,
    two: 1 + 1,
    "thr" + "ee": 6 / 2,
    4: 4,
    true: 5,
    false: 6
}"#,
            "{one: 1, two: 2, three: 3, 4: 4, true: 5, false: 6}",
        )]);
    }

    #[test]
    fn duplicate_hash_keys_keep_the_last_value() {
        expect_values(vec![(r#"{"a": 1, "a": 2}["a"]"#, "2")]);
    }

    #[test]
    fn hash_index_expressions() {
        expect_values(vec![
            (r#"{"foo": 5}["foo"]"#, "5"),
            (r#"{"foo": 5}["bar"]"#, "null"),
            (r#"let key = "foo"; {"foo": 5}[key]"#, "5"),
            (r#"{}["foo"]"#, "null"),
            ("{5: 5}[5]", "5"),
            ("{true: 5}[true]", "5"),
            ("{false: 5}[false]", "5"),
            ("{1: 5}[true]", "null"),
        ]);
    }

    #[test]
    fn environment_persists_between_programs() {
        let env = Environment::new_shared();

        for (input, expected) in [("let a = 2;", "null"), ("let b = a * 3;", "null"), ("a + b", "8")] {
            let program = crate::parser::parse(input).expect("input should parse");
            assert_eq!(expected, evaluator::eval(&program, &env).to_string());
        }
    }
}
