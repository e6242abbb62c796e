use super::{assert_argument_count, BuiltinFunction, EvalError, EvalResult, Object};
use std::rc::Rc;

pub struct BuiltIn {
    pub name: &'static str,
    function: BuiltinFunction,
}

/// The fixed set of functions every program can call without defining them.
pub const BUILTINS: &[BuiltIn] = &[
    BuiltIn {
        name: "len",
        function: len,
    },
    BuiltIn {
        name: "first",
        function: first,
    },
    BuiltIn {
        name: "last",
        function: last,
    },
    BuiltIn {
        name: "tail",
        function: tail,
    },
    BuiltIn {
        name: "push",
        function: push,
    },
];

thread_local! {
    // One shared value per builtin, so `len == len` holds under identity comparison.
    static BUILTIN_OBJECTS: Vec<Rc<Object>> = BUILTINS
        .iter()
        .map(|builtin| Rc::new(Object::Builtin(builtin.name, builtin.function)))
        .collect();
}

pub fn lookup(name: &str) -> Option<Rc<Object>> {
    BUILTIN_OBJECTS.with(|objects| {
        objects
            .iter()
            .find(|obj| matches!(obj.as_ref(), Object::Builtin(builtin, _) if *builtin == name))
            .cloned()
    })
}

fn array_argument<'a>(name: &'static str, arg: &'a Object) -> Result<&'a [Rc<Object>], EvalError> {
    match arg {
        Object::Array(elements) => Ok(elements),
        other => Err(EvalError::WrongArgumentType {
            name,
            expected: "ARRAY",
            got: other.type_name(),
        }),
    }
}

fn len(args: Vec<Rc<Object>>) -> EvalResult {
    assert_argument_count(1, &args)?;

    match args[0].as_ref() {
        Object::String(value) => Ok(Rc::new(Object::Integer(value.len() as i64))),
        Object::Array(elements) => Ok(Rc::new(Object::Integer(elements.len() as i64))),
        other => Err(EvalError::UnsupportedArgument("len", other.type_name())),
    }
}

fn first(args: Vec<Rc<Object>>) -> EvalResult {
    assert_argument_count(1, &args)?;

    let elements = array_argument("first", &args[0])?;
    Ok(elements.first().cloned().unwrap_or_else(Object::null))
}

fn last(args: Vec<Rc<Object>>) -> EvalResult {
    assert_argument_count(1, &args)?;

    let elements = array_argument("last", &args[0])?;
    Ok(elements.last().cloned().unwrap_or_else(Object::null))
}

fn tail(args: Vec<Rc<Object>>) -> EvalResult {
    assert_argument_count(1, &args)?;

    let elements = array_argument("tail", &args[0])?;
    Ok(if elements.is_empty() {
        Object::null()
    } else {
        Rc::new(Object::Array(elements[1..].to_vec()))
    })
}

fn push(args: Vec<Rc<Object>>) -> EvalResult {
    assert_argument_count(2, &args)?;

    let elements = array_argument("push", &args[0])?;
    let mut new_elements = elements.to_vec();
    new_elements.push(Rc::clone(&args[1]));

    Ok(Rc::new(Object::Array(new_elements)))
}
