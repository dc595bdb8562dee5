//! Tree-walking evaluator for function bodies

use std::collections::HashMap;

use super::ast::{BinaryOp, Expr, LogicalOp, Stmt, UnaryOp};
use crate::error::RuntimeError;
use crate::value::{Function, Mapping, Number, Value};

/// Nested calls allowed before a call fails, including accessor invocations
pub const MAX_CALL_DEPTH: usize = 100;

/// Run `function` with `args` at the given call depth
pub(crate) fn invoke(
    function: &Function,
    args: Vec<Value>,
    depth: usize,
) -> Result<Value, RuntimeError> {
    if depth >= MAX_CALL_DEPTH {
        return Err(RuntimeError::CallDepthExceeded {
            limit: MAX_CALL_DEPTH,
        });
    }

    let mut args = args.into_iter();
    let mut params = Scope::new();
    for name in function.params() {
        let value = args.next().unwrap_or_default();
        params.insert(
            name.clone(),
            Binding {
                value,
                constant: false,
            },
        );
    }

    let mut interp = Interpreter {
        scopes: vec![params],
        this: function.this(),
        depth,
    };

    match interp.exec_all(function.body())? {
        Flow::Normal => Ok(Value::Undefined),
        Flow::Return(value) => Ok(value),
        Flow::Break => Err(RuntimeError::StrayControlFlow {
            statement: "break".to_string(),
        }),
        Flow::Continue => Err(RuntimeError::StrayControlFlow {
            statement: "continue".to_string(),
        }),
    }
}

struct Binding {
    value: Value,
    constant: bool,
}

type Scope = HashMap<String, Binding>;

/// How a statement finished
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

struct Interpreter {
    scopes: Vec<Scope>,
    this: Value,
    depth: usize,
}

impl Interpreter {
    fn exec_all(&mut self, statements: &[Stmt]) -> Result<Flow, RuntimeError> {
        for statement in statements {
            match self.exec(statement)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, statement: &Stmt) -> Result<Flow, RuntimeError> {
        match statement {
            Stmt::Declare { constant, bindings } => {
                for (name, init) in bindings {
                    let value = match init {
                        Some(expr) => self.eval(expr)?,
                        None => Value::Undefined,
                    };
                    self.declare(name, value, *constant)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.exec(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.eval(condition)?.is_truthy() {
                    match self.exec(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(expr) => Err(RuntimeError::Thrown(self.eval(expr)?.to_string())),
            Stmt::Block(statements) => {
                self.scopes.push(Scope::new());
                let flow = self.exec_all(statements);
                self.scopes.pop();
                flow
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Empty => Ok(Flow::Normal),
        }
    }

    fn declare(&mut self, name: &str, value: Value, constant: bool) -> Result<(), RuntimeError> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })?;

        if scope.get(name).map_or(false, |binding| binding.constant) {
            return Err(RuntimeError::Redeclaration {
                name: name.to_string(),
            });
        }

        scope.insert(name.to_string(), Binding { value, constant });
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(|binding| binding.value.clone())
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn assign(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let binding = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })?;

        if binding.constant {
            return Err(RuntimeError::ConstAssignment {
                name: name.to_string(),
            });
        }
        binding.value = value;
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::This => Ok(self.this.clone()),
            Expr::Ident(name) => self.lookup(name),
            Expr::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::from(items))
            }
            Expr::Object(entries) => {
                let mapping = Mapping::new();
                for (key, value) in entries {
                    let value = self.eval(value)?;
                    mapping.insert(key.clone(), value);
                }
                Ok(Value::Mapping(mapping))
            }
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                object.get_property_at(property, self.depth + 1)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let key = property_key(&self.eval(index)?);
                object.get_property_at(&key, self.depth + 1)
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                match callee {
                    Value::Function(function) => function.call_at(args, self.depth + 1),
                    other => Err(RuntimeError::NotCallable {
                        what: other.type_name().to_string(),
                    }),
                }
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-to_number(&value)),
                    UnaryOp::Plus => Value::Number(to_number(&value)),
                    UnaryOp::Typeof => Value::from(value.type_name()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then_expr)
                } else {
                    self.eval(else_expr)
                }
            }
            Expr::Assign { target, op, value } => self.eval_assign(target, *op, value),
        }
    }

    fn eval_assign(
        &mut self,
        target: &Expr,
        op: Option<BinaryOp>,
        value: &Expr,
    ) -> Result<Value, RuntimeError> {
        match target {
            Expr::Ident(name) => {
                let value = match op {
                    Some(op) => {
                        let current = self.lookup(name)?;
                        binary(op, &current, &self.eval(value)?)
                    }
                    None => self.eval(value)?,
                };
                self.assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                self.assign_property(&object, property, op, value)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let key = property_key(&self.eval(index)?);
                self.assign_property(&object, &key, op, value)
            }
            _ => Err(RuntimeError::InvalidAssignmentTarget),
        }
    }

    fn assign_property(
        &mut self,
        object: &Value,
        key: &str,
        op: Option<BinaryOp>,
        value: &Expr,
    ) -> Result<Value, RuntimeError> {
        let value = match op {
            Some(op) => {
                let current = object.get_property_at(key, self.depth + 1)?;
                binary(op, &current, &self.eval(value)?)
            }
            None => self.eval(value)?,
        };
        object.set_property_at(key, value.clone(), self.depth + 1)?;
        Ok(value)
    }
}

/// Render an index value as a property key (`a[1]` reads key `"1"`)
fn property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn to_number(value: &Value) -> Number {
    match value {
        Value::Null => Number::Int(0),
        Value::Bool(b) => Number::Int(i64::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Number::Int(0)
            } else if let Ok(i) = s.parse::<i64>() {
                Number::Int(i)
            } else {
                Number::Float(s.parse::<f64>().unwrap_or(f64::NAN))
            }
        }
        _ => Number::Float(f64::NAN),
    }
}

fn concatenates_as_string(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Sequence(_) | Value::Mapping(_) | Value::Function(_)
    )
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if concatenates_as_string(left) || concatenates_as_string(right) {
                Value::String(format!("{}{}", left, right))
            } else {
                Value::Number(to_number(left) + to_number(right))
            }
        }
        BinaryOp::Sub => Value::Number(to_number(left) - to_number(right)),
        BinaryOp::Mul => Value::Number(to_number(left) * to_number(right)),
        BinaryOp::Div => Value::Number(to_number(left) / to_number(right)),
        BinaryOp::Rem => Value::Number(to_number(left) % to_number(right)),
        BinaryOp::Eq => Value::Bool(loose_eq(left, right)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(left, right)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(left, right)),
        BinaryOp::StrictNotEq => Value::Bool(!strict_eq(left, right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => a.partial_cmp(b),
                _ => to_number(left).partial_cmp(&to_number(right)),
            };
            let result = match ordering {
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
                None => false,
            };
            Value::Bool(result)
        }
    }
}

/// `===`: same kind and same value; containers and functions by identity
fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Mapping(a), Value::Mapping(b)) => a.ptr_eq(b),
        (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b),
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => false,
    }
}

/// `==`: `null == undefined`, numbers compare with numeric strings and booleans
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => to_number(left) == to_number(right),
        _ => strict_eq(left, right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(params: &[&str], body: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let params = params.iter().map(|p| p.to_string()).collect();
        Function::new(params, body).unwrap().call(args)
    }

    fn eval(body: &str) -> Value {
        run(&[], body, &[]).unwrap()
    }

    #[test]
    fn test_return_string() {
        assert_eq!(eval("return 'it works';"), Value::from("it works"));
    }

    #[test]
    fn test_arguments() {
        let result = run(&["a", "b"], "return a + b;", &[4.into(), 2.into()]).unwrap();
        assert_eq!(result, Value::from(6));
        let result = run(&["a", "b"], "return a * b;", &[4.into(), 2.into()]).unwrap();
        assert_eq!(result, Value::from(8));
    }

    #[test]
    fn test_missing_argument_is_undefined() {
        let result = run(&["a"], "return a === undefined;", &[]).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_let_and_if_else() {
        assert_eq!(eval(" let val = 42; return val;\n"), Value::from(42));
        let body = "if (num % 2 == 0)\n    return num * 2;\nelse\n    return num * 3;\n";
        assert_eq!(run(&["num"], body, &[10.into()]).unwrap(), Value::from(20));
        assert_eq!(run(&["num"], body, &[11.into()]).unwrap(), Value::from(33));
    }

    #[test]
    fn test_no_return_yields_undefined() {
        assert_eq!(eval("let a = 1;"), Value::Undefined);
        assert_eq!(eval(""), Value::Undefined);
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval("return 'n = ' + 4 + 2;"), Value::from("n = 42"));
        assert_eq!(eval("return 4 + 2 + '!';"), Value::from("6!"));
    }

    #[test]
    fn test_while_loop_with_break_and_continue() {
        let body = "let total = 0, i = 0;
            while (true) {
                i += 1;
                if (i > 10) break;
                if (i % 2) continue;
                total += i;
            }
            return total;";
        assert_eq!(eval(body), Value::from(30));
    }

    #[test]
    fn test_block_scoping() {
        let body = "let x = 1; { let x = 2; } return x;";
        assert_eq!(eval(body), Value::from(1));
    }

    #[test]
    fn test_const_assignment_fails() {
        let err = run(&[], "const c = 1; c = 2;", &[]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::ConstAssignment {
                name: "c".to_string()
            }
        );
    }

    #[test]
    fn test_undefined_variable_fails() {
        let err = run(&[], "return missing;", &[]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::UndefinedVariable {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_throw() {
        let err = run(&[], "throw 'bad ' + 1;", &[]).unwrap_err();
        assert_eq!(err, RuntimeError::Thrown("bad 1".to_string()));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(eval("return null || 'fallback';"), Value::from("fallback"));
        assert_eq!(eval("return 0 && 'never';"), Value::from(0));
        assert_eq!(eval("return 1 < 2 ? 'yes' : 'no';"), Value::from("yes"));
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval("return 1 == '1';"), Value::Bool(true));
        assert_eq!(eval("return 1 === '1';"), Value::Bool(false));
        assert_eq!(eval("return null == undefined;"), Value::Bool(true));
        assert_eq!(eval("return null === undefined;"), Value::Bool(false));
        assert_eq!(eval("return 2 === 2.0;"), Value::Bool(true));
    }

    #[test]
    fn test_typeof() {
        assert_eq!(eval("return typeof 1;"), Value::from("number"));
        assert_eq!(eval("return typeof [];"), Value::from("object"));
        assert_eq!(eval("return typeof undefined;"), Value::from("undefined"));
    }

    #[test]
    fn test_object_and_array_literals() {
        let result = eval("let o = { list: [1, 2, 3] }; o.list[1] = 20; return o.list[1] + o.list.length;");
        assert_eq!(result, Value::from(23));
    }

    #[test]
    fn test_calling_function_argument() {
        let callback = Function::new(vec!["x".to_string()], "return x * 2;").unwrap();
        let result = run(&["f"], "return f(21);", &[Value::Function(callback)]).unwrap();
        assert_eq!(result, Value::from(42));
    }

    #[test]
    fn test_calling_non_function_fails() {
        let err = run(&[], "let a = 1; return a();", &[]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::NotCallable {
                what: "number".to_string()
            }
        );
    }

    #[test]
    fn test_this_without_receiver_is_undefined() {
        assert_eq!(eval("return this;"), Value::Undefined);
        let err = run(&[], "return this.x;", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidPropertyRead { .. }));
    }

    #[test]
    fn test_recursion_depth_is_bounded() {
        let recurse = Function::new(vec!["f".to_string()], "return f(f);").unwrap();
        assert_eq!(
            recurse.call(&[Value::Function(recurse.clone())]),
            Err(RuntimeError::CallDepthExceeded {
                limit: MAX_CALL_DEPTH
            })
        );
    }

    #[test]
    fn test_sequence_write_far_past_end_fails() {
        let list = Value::from(Vec::<Value>::new());
        assert_eq!(
            run(&["list"], "list[99999999999999] = 1;", &[list.clone()]),
            Err(RuntimeError::IndexTooLarge {
                index: 99999999999999,
                len: 0
            })
        );
        assert_eq!(run(&["list"], "return list.length;", &[list]), Ok(Value::from(0)));
    }
}
