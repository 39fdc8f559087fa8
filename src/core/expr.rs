//! Expression trees evaluated by the store verbs
//!
//! Verbs take an explicit [`Expr`] instead of late-bound symbols. An
//! expression is evaluated in a context made of a [`Frame`] (the rows),
//! the current row, and the rows of the current group. Aggregates need a
//! group; bare column references need a row. Using either without its
//! context is an [`RangesError::InvalidContext`].
//!
//! ```
//! use tidyranges::core::expr::{col, lit, mean};
//! // keep rows scoring above their group's mean
//! let predicate = col("score").gt(mean(col("score")));
//! // widen by one base
//! let width = col("width") + lit(1);
//! # let _ = (predicate, width);
//! ```

use crate::core::error::{RangesError, Result};
use crate::core::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Tabular data an expression can read from
pub trait Frame {
    /// Value of `column` at `row`
    fn value(&self, row: usize, column: &str) -> Result<Value>;

    /// True if `column` can be read
    fn has_column(&self, column: &str) -> bool;

    /// All readable column names
    fn column_names(&self) -> Vec<String>;
}

/// Read-only view of a single row, handed to closures
pub struct RowView<'a> {
    frame: &'a dyn Frame,
    row: usize,
}

impl<'a> RowView<'a> {
    /// Value of `column` in this row
    pub fn get(&self, column: &str) -> Result<Value> {
        self.frame.value(self.row, column)
    }

    /// Numeric value of `column`, `None` when missing or non-numeric
    pub fn get_f64(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.get(column)?.as_f64())
    }

    /// Position of the row in its store
    pub fn index(&self) -> usize {
        self.row
    }
}

/// Closure over a row
pub type RowFn = Arc<dyn Fn(&RowView<'_>) -> Result<Value> + Send + Sync>;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Aggregate functions; missing values are skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFn {
    /// Number of non-missing values
    Count,
    Sum,
    Mean,
    Median,
    Min,
    Max,
    NDistinct,
    First,
    Last,
}

impl AggFn {
    pub fn name(&self) -> &'static str {
        match self {
            AggFn::Count => "n",
            AggFn::Sum => "sum",
            AggFn::Mean => "mean",
            AggFn::Median => "median",
            AggFn::Min => "min",
            AggFn::Max => "max",
            AggFn::NDistinct => "n_distinct",
            AggFn::First => "first",
            AggFn::Last => "last",
        }
    }

    fn reduce(&self, values: Vec<Value>) -> Result<Value> {
        if let AggFn::First = self {
            return Ok(values.into_iter().next().unwrap_or_default());
        }
        if let AggFn::Last = self {
            return Ok(values.into_iter().last().unwrap_or_default());
        }

        let present: Vec<Value> = values.into_iter().filter(|v| !v.is_missing()).collect();
        match self {
            AggFn::Count => Ok(Value::Int(present.len() as i64)),
            AggFn::NDistinct => {
                let distinct: HashSet<&Value> = present.iter().collect();
                Ok(Value::Int(distinct.len() as i64))
            }
            AggFn::Min => Ok(present
                .into_iter()
                .min_by(|a, b| a.sort_cmp(b))
                .unwrap_or_default()),
            AggFn::Max => Ok(present
                .into_iter()
                .max_by(|a, b| a.sort_cmp(b))
                .unwrap_or_default()),
            AggFn::Sum => {
                let total = present.iter().try_fold(0i64, |acc, v| match v {
                    Value::Int(x) => acc.checked_add(*x),
                    _ => None,
                });
                match total {
                    Some(total) => Ok(Value::Int(total)),
                    // mixed types or i64 overflow
                    None => Ok(Value::Float(self.numeric(&present)?.iter().sum())),
                }
            }
            AggFn::Mean => {
                let nums = self.numeric(&present)?;
                if nums.is_empty() {
                    return Ok(Value::Missing);
                }
                Ok(Value::Float(nums.iter().sum::<f64>() / nums.len() as f64))
            }
            AggFn::Median => {
                let mut nums = self.numeric(&present)?;
                if nums.is_empty() {
                    return Ok(Value::Missing);
                }
                nums.sort_by(|a, b| a.total_cmp(b));
                let mid = nums.len() / 2;
                let median = if nums.len() % 2 == 0 {
                    (nums[mid - 1] + nums[mid]) / 2.0
                } else {
                    nums[mid]
                };
                Ok(Value::Float(median))
            }
            AggFn::First | AggFn::Last => unreachable!("handled above"),
        }
    }

    fn numeric(&self, values: &[Value]) -> Result<Vec<f64>> {
        values
            .iter()
            .map(|v| {
                v.as_f64().ok_or_else(|| {
                    RangesError::TypeMismatch(format!(
                        "{}() needs numbers, got {} '{}'",
                        self.name(),
                        v.type_name(),
                        v
                    ))
                })
            })
            .collect()
    }
}

/// An expression over the columns of a frame
#[derive(Clone)]
pub enum Expr {
    Col(String),
    Lit(Value),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    IsMissing(Box<Expr>),
    Agg(AggFn, Box<Expr>),
    Map(RowFn),
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Col(name) => write!(f, "{}", name),
            Expr::Lit(v) => write!(f, "{:?}", v),
            Expr::Binary(op, a, b) => write!(f, "({:?} {:?} {:?})", a, op, b),
            Expr::Not(e) => write!(f, "!{:?}", e),
            Expr::Neg(e) => write!(f, "-{:?}", e),
            Expr::IsMissing(e) => write!(f, "is_missing({:?})", e),
            Expr::Agg(agg, e) => write!(f, "{}({:?})", agg.name(), e),
            Expr::Map(_) => write!(f, "<fn>"),
        }
    }
}

/// Reference a column
pub fn col(name: &str) -> Expr {
    Expr::Col(name.to_string())
}

/// A literal value
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Lit(value.into())
}

/// Arbitrary closure over the current row
pub fn map<F>(f: F) -> Expr
where
    F: Fn(&RowView<'_>) -> Result<Value> + Send + Sync + 'static,
{
    Expr::Map(Arc::new(f))
}

/// Number of rows in the group
pub fn n() -> Expr {
    Expr::Agg(AggFn::Count, Box::new(lit(1)))
}

pub fn count(e: Expr) -> Expr {
    Expr::Agg(AggFn::Count, Box::new(e))
}

pub fn sum(e: Expr) -> Expr {
    Expr::Agg(AggFn::Sum, Box::new(e))
}

pub fn mean(e: Expr) -> Expr {
    Expr::Agg(AggFn::Mean, Box::new(e))
}

pub fn median(e: Expr) -> Expr {
    Expr::Agg(AggFn::Median, Box::new(e))
}

pub fn min(e: Expr) -> Expr {
    Expr::Agg(AggFn::Min, Box::new(e))
}

pub fn max(e: Expr) -> Expr {
    Expr::Agg(AggFn::Max, Box::new(e))
}

pub fn n_distinct(e: Expr) -> Expr {
    Expr::Agg(AggFn::NDistinct, Box::new(e))
}

pub fn first(e: Expr) -> Expr {
    Expr::Agg(AggFn::First, Box::new(e))
}

pub fn last(e: Expr) -> Expr {
    Expr::Agg(AggFn::Last, Box::new(e))
}

impl Expr {
    fn binary(self, op: BinOp, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(self), Box::new(rhs))
    }

    pub fn eq(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Eq, rhs)
    }

    pub fn ne(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Ne, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Lt, rhs)
    }

    pub fn le(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Le, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Gt, rhs)
    }

    pub fn ge(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Ge, rhs)
    }

    pub fn and(self, rhs: Expr) -> Expr {
        self.binary(BinOp::And, rhs)
    }

    pub fn or(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Or, rhs)
    }

    pub fn is_missing(self) -> Expr {
        Expr::IsMissing(Box::new(self))
    }

    /// Columns referenced by name (closures are opaque)
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Col(name) => out.push(name),
            Expr::Binary(_, a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
            Expr::Not(e) | Expr::Neg(e) | Expr::IsMissing(e) | Expr::Agg(_, e) => {
                e.collect_columns(out)
            }
            Expr::Lit(_) | Expr::Map(_) => {}
        }
    }

    /// Fail with a schema error if a referenced column is not in `frame`
    pub fn check_columns(&self, frame: &dyn Frame) -> Result<()> {
        for name in self.referenced_columns() {
            if !frame.has_column(name) {
                return Err(RangesError::unknown_column(name, &frame.column_names()));
            }
        }
        Ok(())
    }

    /// Evaluate outside of any verb: only literal arithmetic is allowed
    ///
    /// # Examples
    /// ```
    /// use tidyranges::core::expr::{col, lit, mean};
    /// use tidyranges::core::Value;
    /// assert_eq!((lit(2) + lit(3)).evaluate().unwrap(), Value::Int(5));
    /// assert!(mean(col("score")).evaluate().is_err());
    /// ```
    pub fn evaluate(&self) -> Result<Value> {
        let ctx = EvalContext::detached(&NoFrame);
        self.eval(&ctx, None)
    }

    pub(crate) fn eval(&self, ctx: &EvalContext<'_>, row: Option<usize>) -> Result<Value> {
        match self {
            Expr::Lit(v) => Ok(v.clone()),
            Expr::Col(name) => match row {
                Some(r) => ctx.frame.value(r, name),
                None => Err(RangesError::InvalidContext(format!(
                    "column '{}' must be wrapped in an aggregate here",
                    name
                ))),
            },
            Expr::Map(f) => match row {
                Some(r) => f(&RowView {
                    frame: ctx.frame,
                    row: r,
                }),
                None => Err(RangesError::InvalidContext(
                    "row closure used where no row is available".to_string(),
                )),
            },
            Expr::Binary(op, a, b) => apply_binary(*op, a.eval(ctx, row)?, b.eval(ctx, row)?),
            Expr::Not(e) => match e.eval(ctx, row)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                Value::Missing => Ok(Value::Missing),
                other => Err(type_error("!", &other, &Value::Missing)),
            },
            Expr::Neg(e) => match e.eval(ctx, row)? {
                Value::Int(i) => Ok(Value::Int(-i)),
                Value::Float(f) => Ok(Value::Float(-f)),
                Value::Missing => Ok(Value::Missing),
                other => Err(type_error("-", &other, &Value::Missing)),
            },
            Expr::IsMissing(e) => Ok(Value::Bool(e.eval(ctx, row)?.is_missing())),
            Expr::Agg(agg, inner) => ctx.aggregate(self, *agg, inner),
        }
    }
}

struct NoFrame;

impl Frame for NoFrame {
    fn value(&self, _row: usize, column: &str) -> Result<Value> {
        Err(RangesError::unknown_column::<&str>(column, &[]))
    }

    fn has_column(&self, _column: &str) -> bool {
        false
    }

    fn column_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Evaluation context: the frame plus the rows of the current group
///
/// Aggregate results are cached per expression node; a context must not
/// outlive the group it was created for.
pub(crate) struct EvalContext<'a> {
    frame: &'a dyn Frame,
    group: Option<&'a [usize]>,
    cache: RefCell<HashMap<usize, Value>>,
}

impl<'a> EvalContext<'a> {
    /// Context with a group: aggregates range over `group`
    pub(crate) fn grouped(frame: &'a dyn Frame, group: &'a [usize]) -> Self {
        Self {
            frame,
            group: Some(group),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Context without a group: aggregates are rejected
    pub(crate) fn detached(frame: &'a dyn Frame) -> Self {
        Self {
            frame,
            group: None,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn aggregate(&self, node: &Expr, agg: AggFn, inner: &Expr) -> Result<Value> {
        let group = self.group.ok_or_else(|| {
            RangesError::InvalidContext(format!(
                "aggregate {}() used outside a filter, mutate or summarise",
                agg.name()
            ))
        })?;

        let key = node as *const Expr as usize;
        if let Some(v) = self.cache.borrow().get(&key) {
            return Ok(v.clone());
        }

        let values = group
            .iter()
            .map(|&r| inner.eval(self, Some(r)))
            .collect::<Result<Vec<_>>>()?;
        let result = agg.reduce(values)?;
        self.cache.borrow_mut().insert(key, result.clone());
        Ok(result)
    }
}

fn type_error(op: &str, a: &Value, b: &Value) -> RangesError {
    RangesError::TypeMismatch(format!(
        "cannot apply '{}' to {} and {}",
        op,
        a.type_name(),
        b.type_name()
    ))
}

fn apply_binary(op: BinOp, a: Value, b: Value) -> Result<Value> {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => arithmetic(op, a, b),
        BinOp::And | BinOp::Or => logical(op, a, b),
        _ => {
            if a.is_missing() || b.is_missing() {
                return Ok(Value::Missing);
            }
            let ord = a
                .compare(&b)
                .ok_or_else(|| type_error(&format!("{:?}", op), &a, &b))?;
            let result = match op {
                BinOp::Eq => ord == Ordering::Equal,
                BinOp::Ne => ord != Ordering::Equal,
                BinOp::Lt => ord == Ordering::Less,
                BinOp::Le => ord != Ordering::Greater,
                BinOp::Gt => ord == Ordering::Greater,
                BinOp::Ge => ord != Ordering::Less,
                _ => unreachable!("arithmetic and logical operators handled above"),
            };
            Ok(Value::Bool(result))
        }
    }
}

fn arithmetic(op: BinOp, a: Value, b: Value) -> Result<Value> {
    if a.is_missing() || b.is_missing() {
        return Ok(Value::Missing);
    }
    if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
        let v = match op {
            BinOp::Add => x.checked_add(*y),
            BinOp::Sub => x.checked_sub(*y),
            BinOp::Mul => x.checked_mul(*y),
            _ => None,
        };
        if let Some(v) = v {
            return Ok(Value::Int(v));
        }
    }
    let (x, y) = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(type_error(&format!("{:?}", op), &a, &b)),
    };
    let v = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        _ => x / y,
    };
    Ok(Value::Float(v))
}

// Three-valued logic: missing only wins when the other side cannot decide.
fn logical(op: BinOp, a: Value, b: Value) -> Result<Value> {
    let as_logic = |v: &Value| match v {
        Value::Bool(b) => Ok(Some(*b)),
        Value::Missing => Ok(None),
        other => Err(type_error(&format!("{:?}", op), other, &Value::Bool(true))),
    };
    let (x, y) = (as_logic(&a)?, as_logic(&b)?);
    let v = match op {
        BinOp::And => match (x, y) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        _ => match (x, y) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
    };
    Ok(v.map(Value::Bool).unwrap_or(Value::Missing))
}

impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Add, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Sub, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Mul, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Div, rhs)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}
