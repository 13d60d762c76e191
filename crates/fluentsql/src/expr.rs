//! Typed predicate and projection DSL.
//!
//! Columns are typed by the entity they belong to and the Rust type they hold,
//! so `User::AGE.gt(18)` only compiles when `AGE` is a numeric column of `User`.
//! Literal operands are never spliced into SQL; they are bound into the
//! query's [`Params`] under keys derived from the column's property name.
//!
//! ```ignore
//! let adults = User::AGE.ge(18) & User::NAME.like("a%");
//! let either = User::ID.eq(1) | User::ID.eq(2);
//! let total = (User::BALANCE + 10).sum().alias("total");
//! ```

use crate::error::{OrmError, OrmResult};
use crate::param::{Param, Params, is_valid_key};
use std::marker::PhantomData;
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Not, Sub};
use tokio_postgres::types::ToSql;

/// A mapped column of entity `E` holding values of type `V`.
pub struct Column<E, V> {
    property: &'static str,
    name: &'static str,
    _marker: PhantomData<fn() -> (E, V)>,
}

impl<E, V> Column<E, V> {
    pub const fn new(property: &'static str, name: &'static str) -> Self {
        Self {
            property,
            name,
            _marker: PhantomData,
        }
    }

    /// SQL column name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Rust field name.
    pub const fn property(&self) -> &'static str {
        self.property
    }
}

impl<E, V> Clone for Column<E, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, V> Copy for Column<E, V> {}

impl<E, V> std::fmt::Debug for Column<E, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("property", &self.property)
            .finish()
    }
}

/// A computed value of type `V`: arithmetic over columns or an aggregate.
pub struct ValueExpr<E, V> {
    operand: Operand,
    property: &'static str,
    _marker: PhantomData<fn() -> (E, V)>,
}

impl<E, V> ValueExpr<E, V> {
    fn new(operand: Operand, property: &'static str) -> Self {
        Self {
            operand,
            property,
            _marker: PhantomData,
        }
    }
}

impl<E, V> Clone for ValueExpr<E, V> {
    fn clone(&self) -> Self {
        Self::new(self.operand.clone(), self.property)
    }
}

impl<E, V> std::fmt::Debug for ValueExpr<E, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueExpr")
            .field("operand", &self.operand)
            .field("property", &self.property)
            .finish()
    }
}

/// `COUNT(1)` over the whole (filtered) table.
pub fn count_all<E>() -> ValueExpr<E, i64> {
    ValueExpr::new(
        Operand::Call {
            func: "COUNT",
            arg: None,
            distinct: false,
        },
        "count",
    )
}

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Untyped value node behind [`Column`] and [`ValueExpr`].
#[doc(hidden)]
#[derive(Debug, Clone)]
pub enum Operand {
    Column {
        name: &'static str,
    },
    Value {
        hint: &'static str,
        param: Param,
    },
    Binary {
        left: Box<Operand>,
        op: ArithOp,
        right: Box<Operand>,
    },
    Call {
        func: &'static str,
        arg: Option<Box<Operand>>,
        distinct: bool,
    },
}

impl Operand {
    fn value<V: ToSql + Send + Sync + 'static>(hint: &'static str, value: V) -> Self {
        Operand::Value {
            hint,
            param: Param::new(value),
        }
    }

    fn render(self, params: &mut Params) -> String {
        match self {
            Operand::Column { name } => name.to_string(),
            Operand::Value { hint, param } => format!("@{}", params.bind(hint, param)),
            Operand::Binary { left, op, right } => {
                let left = left.render(params);
                let right = right.render(params);
                format!("({left} {} {right})", op.as_str())
            }
            Operand::Call {
                func,
                arg: None,
                ..
            } => format!("{func}(1)"),
            Operand::Call {
                func,
                arg: Some(arg),
                distinct,
            } => {
                let arg = arg.render(params);
                if distinct {
                    format!("{func}(DISTINCT {arg})")
                } else {
                    format!("{func}({arg})")
                }
            }
        }
    }
}

/// Operations shared by columns and computed values of type `V`.
pub trait Field<E, V>: Sized {
    #[doc(hidden)]
    fn into_operand(self) -> Operand;

    /// Property name used for parameter keys and default aliases.
    fn property(&self) -> &'static str;

    fn eq(self, value: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        compare_value(self, "=", value.into())
    }

    fn ne(self, value: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        compare_value(self, "<>", value.into())
    }

    fn gt(self, value: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        compare_value(self, ">", value.into())
    }

    fn ge(self, value: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        compare_value(self, ">=", value.into())
    }

    fn lt(self, value: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        compare_value(self, "<", value.into())
    }

    fn le(self, value: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        compare_value(self, "<=", value.into())
    }

    fn like(self, pattern: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        compare_value(self, "LIKE", pattern.into())
    }

    fn not_like(self, pattern: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        compare_value(self, "NOT LIKE", pattern.into())
    }

    /// `field IN (...)`; an empty list matches nothing.
    fn in_list<T: Into<V>>(self, values: impl IntoIterator<Item = T>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        in_list(self, values, false)
    }

    /// `field NOT IN (...)`; an empty list matches everything.
    fn not_in<T: Into<V>>(self, values: impl IntoIterator<Item = T>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        in_list(self, values, true)
    }

    fn between(self, low: impl Into<V>, high: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        let hint = self.property();
        Expr::from_node(Node::Between {
            operand: self.into_operand(),
            low: Operand::value(hint, low.into()),
            high: Operand::value(hint, high.into()),
            negated: false,
        })
    }

    fn not_between(self, low: impl Into<V>, high: impl Into<V>) -> Expr<E>
    where
        V: ToSql + Send + Sync + 'static,
    {
        let hint = self.property();
        Expr::from_node(Node::Between {
            operand: self.into_operand(),
            low: Operand::value(hint, low.into()),
            high: Operand::value(hint, high.into()),
            negated: true,
        })
    }

    fn is_null(self) -> Expr<E> {
        Expr::from_node(Node::NullCheck {
            operand: self.into_operand(),
            negated: false,
        })
    }

    fn is_not_null(self) -> Expr<E> {
        Expr::from_node(Node::NullCheck {
            operand: self.into_operand(),
            negated: true,
        })
    }

    fn eq_field(self, other: impl Field<E, V>) -> Expr<E> {
        compare_field(self, "=", other)
    }

    fn ne_field(self, other: impl Field<E, V>) -> Expr<E> {
        compare_field(self, "<>", other)
    }

    fn gt_field(self, other: impl Field<E, V>) -> Expr<E> {
        compare_field(self, ">", other)
    }

    fn ge_field(self, other: impl Field<E, V>) -> Expr<E> {
        compare_field(self, ">=", other)
    }

    fn lt_field(self, other: impl Field<E, V>) -> Expr<E> {
        compare_field(self, "<", other)
    }

    fn le_field(self, other: impl Field<E, V>) -> Expr<E> {
        compare_field(self, "<=", other)
    }

    fn count(self) -> ValueExpr<E, i64> {
        aggregate(self, "COUNT", false)
    }

    fn count_distinct(self) -> ValueExpr<E, i64> {
        aggregate(self, "COUNT", true)
    }

    fn sum(self) -> ValueExpr<E, V> {
        aggregate(self, "SUM", false)
    }

    fn max(self) -> ValueExpr<E, V> {
        aggregate(self, "MAX", false)
    }

    fn min(self) -> ValueExpr<E, V> {
        aggregate(self, "MIN", false)
    }

    /// `AVG(field)`; Postgres returns `numeric` for integer inputs, so cast
    /// the column if the result is decoded as `f64`.
    fn avg(self) -> ValueExpr<E, f64> {
        aggregate(self, "AVG", false)
    }

    /// Select this value under an explicit alias.
    fn alias(self, alias: impl Into<String>) -> Aliased<E> {
        Aliased {
            operand: self.into_operand(),
            alias: alias.into(),
            _marker: PhantomData,
        }
    }
}

impl<E, V> Field<E, V> for Column<E, V> {
    fn into_operand(self) -> Operand {
        Operand::Column { name: self.name }
    }

    fn property(&self) -> &'static str {
        self.property
    }
}

impl<E, V> Field<E, V> for ValueExpr<E, V> {
    fn into_operand(self) -> Operand {
        self.operand
    }

    fn property(&self) -> &'static str {
        self.property
    }
}

/// Render a value expression, binding its literals into `params`.
pub(crate) fn render_field<E, V>(field: impl Field<E, V>, params: &mut Params) -> String {
    field.into_operand().render(params)
}

fn compare_value<E, V, F>(field: F, op: &'static str, value: V) -> Expr<E>
where
    F: Field<E, V>,
    V: ToSql + Send + Sync + 'static,
{
    let hint = field.property();
    Expr::from_node(Node::Compare {
        left: field.into_operand(),
        op,
        right: Operand::value(hint, value),
    })
}

fn compare_field<E, V, L, R>(left: L, op: &'static str, right: R) -> Expr<E>
where
    L: Field<E, V>,
    R: Field<E, V>,
{
    Expr::from_node(Node::Compare {
        left: left.into_operand(),
        op,
        right: right.into_operand(),
    })
}

fn in_list<E, V, F, T>(field: F, values: impl IntoIterator<Item = T>, negated: bool) -> Expr<E>
where
    F: Field<E, V>,
    T: Into<V>,
    V: ToSql + Send + Sync + 'static,
{
    let hint = field.property();
    Expr::from_node(Node::InList {
        operand: field.into_operand(),
        values: values
            .into_iter()
            .map(|v| Operand::value(hint, v.into()))
            .collect(),
        negated,
    })
}

fn aggregate<E, V, R, F>(field: F, func: &'static str, distinct: bool) -> ValueExpr<E, R>
where
    F: Field<E, V>,
{
    let property = field.property();
    ValueExpr::new(
        Operand::Call {
            func,
            arg: Some(Box::new(field.into_operand())),
            distinct,
        },
        property,
    )
}

fn arith_value<E, V, F>(left: F, op: ArithOp, value: V) -> ValueExpr<E, V>
where
    F: Field<E, V>,
    V: ToSql + Send + Sync + 'static,
{
    let property = left.property();
    ValueExpr::new(
        Operand::Binary {
            left: Box::new(left.into_operand()),
            op,
            right: Box::new(Operand::value(property, value)),
        },
        property,
    )
}

fn arith_field<E, V, L, R>(left: L, op: ArithOp, right: R) -> ValueExpr<E, V>
where
    L: Field<E, V>,
    R: Field<E, V>,
{
    let property = left.property();
    ValueExpr::new(
        Operand::Binary {
            left: Box::new(left.into_operand()),
            op,
            right: Box::new(right.into_operand()),
        },
        property,
    )
}

macro_rules! impl_arithmetic {
    (@op $ty:ty, $trait:ident, $method:ident, $op:expr) => {
        impl<E> $trait<$ty> for Column<E, $ty> {
            type Output = ValueExpr<E, $ty>;
            fn $method(self, rhs: $ty) -> Self::Output {
                arith_value(self, $op, rhs)
            }
        }

        impl<E> $trait<$ty> for ValueExpr<E, $ty> {
            type Output = ValueExpr<E, $ty>;
            fn $method(self, rhs: $ty) -> Self::Output {
                arith_value(self, $op, rhs)
            }
        }

        impl<E> $trait<Column<E, $ty>> for Column<E, $ty> {
            type Output = ValueExpr<E, $ty>;
            fn $method(self, rhs: Column<E, $ty>) -> Self::Output {
                arith_field(self, $op, rhs)
            }
        }

        impl<E> $trait<ValueExpr<E, $ty>> for Column<E, $ty> {
            type Output = ValueExpr<E, $ty>;
            fn $method(self, rhs: ValueExpr<E, $ty>) -> Self::Output {
                arith_field(self, $op, rhs)
            }
        }

        impl<E> $trait<Column<E, $ty>> for ValueExpr<E, $ty> {
            type Output = ValueExpr<E, $ty>;
            fn $method(self, rhs: Column<E, $ty>) -> Self::Output {
                arith_field(self, $op, rhs)
            }
        }

        impl<E> $trait<ValueExpr<E, $ty>> for ValueExpr<E, $ty> {
            type Output = ValueExpr<E, $ty>;
            fn $method(self, rhs: ValueExpr<E, $ty>) -> Self::Output {
                arith_field(self, $op, rhs)
            }
        }
    };
    ($($ty:ty),* $(,)?) => {
        $(
            impl_arithmetic!(@op $ty, Add, add, ArithOp::Add);
            impl_arithmetic!(@op $ty, Sub, sub, ArithOp::Sub);
            impl_arithmetic!(@op $ty, Mul, mul, ArithOp::Mul);
            impl_arithmetic!(@op $ty, Div, div, ArithOp::Div);
        )*
    };
}

impl_arithmetic!(i16, i32, i64, f32, f64);

/// A value selected under an explicit alias.
pub struct Aliased<E> {
    operand: Operand,
    alias: String,
    _marker: PhantomData<fn() -> E>,
}

impl<E> std::fmt::Debug for Aliased<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aliased")
            .field("operand", &self.operand)
            .field("alias", &self.alias)
            .finish()
    }
}

#[derive(Debug, Clone)]
enum Node {
    Compare {
        left: Operand,
        op: &'static str,
        right: Operand,
    },
    Between {
        operand: Operand,
        low: Operand,
        high: Operand,
        negated: bool,
    },
    InList {
        operand: Operand,
        values: Vec<Operand>,
        negated: bool,
    },
    NullCheck {
        operand: Operand,
        negated: bool,
    },
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Raw(String),
    True,
    False,
}

impl Node {
    /// `nested` is set when the fragment is an operand of AND/OR/NOT.
    fn render(self, params: &mut Params, nested: bool) -> OrmResult<String> {
        Ok(match self {
            Node::Compare { left, op, right } => {
                let left = left.render(params);
                let right = right.render(params);
                format!("{left} {op} {right}")
            }
            Node::Between {
                operand,
                low,
                high,
                negated,
            } => {
                let operand = operand.render(params);
                let low = low.render(params);
                let high = high.render(params);
                let not = if negated { "NOT " } else { "" };
                format!("{operand} {not}BETWEEN {low} AND {high}")
            }
            Node::InList {
                values, negated, ..
            } if values.is_empty() => {
                if negated {
                    "1=1".to_string()
                } else {
                    "1=0".to_string()
                }
            }
            Node::InList {
                operand,
                values,
                negated,
            } => {
                let operand = operand.render(params);
                let list: Vec<String> = values.into_iter().map(|v| v.render(params)).collect();
                let not = if negated { "NOT " } else { "" };
                format!("{operand} {not}IN ({})", list.join(", "))
            }
            Node::NullCheck { operand, negated } => {
                let operand = operand.render(params);
                if negated {
                    format!("{operand} IS NOT NULL")
                } else {
                    format!("{operand} IS NULL")
                }
            }
            Node::And(children) => {
                return render_group(children, " AND ", "1=1", params, nested, false);
            }
            Node::Or(children) => {
                return render_group(children, " OR ", "1=0", params, nested, true);
            }
            Node::Not(inner) => format!("NOT ({})", inner.render(params, false)?),
            Node::Raw(sql) => {
                if sql.trim().is_empty() {
                    return Err(OrmError::unsupported("empty raw SQL fragment"));
                }
                // Always wrapped: the text may carry its own OR.
                format!("({sql})")
            }
            Node::True => "1=1".to_string(),
            Node::False => "1=0".to_string(),
        })
    }
}

fn render_group(
    mut children: Vec<Node>,
    sep: &str,
    empty: &str,
    params: &mut Params,
    nested: bool,
    always_wrap: bool,
) -> OrmResult<String> {
    match children.len() {
        0 => Ok(empty.to_string()),
        1 => match children.pop() {
            Some(only) => only.render(params, nested),
            None => Ok(empty.to_string()),
        },
        _ => {
            let parts = children
                .into_iter()
                .map(|c| c.render(params, true))
                .collect::<OrmResult<Vec<_>>>()?;
            let joined = parts.join(sep);
            // OR fragments are always wrapped so they survive being AND-joined.
            if nested || always_wrap {
                Ok(format!("({joined})"))
            } else {
                Ok(joined)
            }
        }
    }
}

/// Boolean predicate over entity `E`.
pub struct Expr<E> {
    node: Node,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for Expr<E> {
    fn clone(&self) -> Self {
        Self::from_node(self.node.clone())
    }
}

impl<E> std::fmt::Debug for Expr<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Expr").field(&self.node).finish()
    }
}

impl<E> Expr<E> {
    fn from_node(node: Node) -> Self {
        Self {
            node,
            _marker: PhantomData,
        }
    }

    /// Caller-written SQL; values must be bound separately.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::from_node(Node::Raw(sql.into()))
    }

    /// Always true.
    pub fn always() -> Self {
        Self::from_node(Node::True)
    }

    /// Always false.
    pub fn never() -> Self {
        Self::from_node(Node::False)
    }

    /// Conjunction of all predicates; true when empty.
    pub fn all(exprs: impl IntoIterator<Item = Expr<E>>) -> Self {
        Self::from_node(Node::And(exprs.into_iter().map(|e| e.node).collect()))
    }

    /// Disjunction of all predicates; false when empty.
    pub fn any(exprs: impl IntoIterator<Item = Expr<E>>) -> Self {
        Self::from_node(Node::Or(exprs.into_iter().map(|e| e.node).collect()))
    }

    pub fn and(self, other: Expr<E>) -> Self {
        match self.node {
            Node::And(mut children) => {
                children.push(other.node);
                Self::from_node(Node::And(children))
            }
            node => Self::from_node(Node::And(vec![node, other.node])),
        }
    }

    pub fn or(self, other: Expr<E>) -> Self {
        match self.node {
            Node::Or(mut children) => {
                children.push(other.node);
                Self::from_node(Node::Or(children))
            }
            node => Self::from_node(Node::Or(vec![node, other.node])),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::from_node(Node::Not(Box::new(self.node)))
    }
}

impl<E> BitAnd for Expr<E> {
    type Output = Expr<E>;
    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl<E> BitOr for Expr<E> {
    type Output = Expr<E>;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl<E> Not for Expr<E> {
    type Output = Expr<E>;
    fn not(self) -> Self::Output {
        Expr::not(self)
    }
}

/// Something that renders to a boolean SQL condition.
pub trait Predicate<E> {
    /// Render the condition, binding literals into `params`.
    fn build_expression(self, params: &mut Params) -> OrmResult<String>;
}

impl<E> Predicate<E> for Expr<E> {
    fn build_expression(self, params: &mut Params) -> OrmResult<String> {
        self.node.render(params, false)
    }
}

/// One projected column: the property it maps to and its SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub property: String,
    pub sql: String,
}

impl SelectItem {
    /// `sql AS property`.
    pub fn aliased(&self) -> String {
        format!("{} AS {}", self.sql, self.property)
    }
}

/// Something that renders to an ordered list of columns.
pub trait Projection<E> {
    fn build_columns(self, params: &mut Params) -> OrmResult<Vec<SelectItem>>;
}

impl<E, V> Projection<E> for Column<E, V> {
    fn build_columns(self, _params: &mut Params) -> OrmResult<Vec<SelectItem>> {
        Ok(vec![SelectItem {
            property: self.property.to_string(),
            sql: self.name.to_string(),
        }])
    }
}

impl<E, V> Projection<E> for ValueExpr<E, V> {
    fn build_columns(self, params: &mut Params) -> OrmResult<Vec<SelectItem>> {
        Ok(vec![SelectItem {
            property: self.property.to_string(),
            sql: self.operand.render(params),
        }])
    }
}

impl<E> Projection<E> for Aliased<E> {
    fn build_columns(self, params: &mut Params) -> OrmResult<Vec<SelectItem>> {
        if !is_valid_key(&self.alias) {
            return Err(OrmError::unsupported(format!(
                "alias '{}' is not a plain identifier",
                self.alias
            )));
        }
        Ok(vec![SelectItem {
            sql: self.operand.render(params),
            property: self.alias,
        }])
    }
}

impl<E, P: Projection<E>> Projection<E> for Vec<P> {
    fn build_columns(self, params: &mut Params) -> OrmResult<Vec<SelectItem>> {
        let mut items = Vec::with_capacity(self.len());
        for p in self {
            items.extend(p.build_columns(params)?);
        }
        if items.is_empty() {
            return Err(OrmError::unsupported("projection selects no columns"));
        }
        Ok(items)
    }
}

macro_rules! impl_projection_tuple {
    ($($p:ident),+) => {
        impl<E, $($p: Projection<E>),+> Projection<E> for ($($p,)+) {
            #[allow(non_snake_case)]
            fn build_columns(self, params: &mut Params) -> OrmResult<Vec<SelectItem>> {
                let ($($p,)+) = self;
                let mut items = Vec::new();
                $(items.extend($p.build_columns(params)?);)+
                Ok(items)
            }
        }
    };
}

impl_projection_tuple!(A);
impl_projection_tuple!(A, B);
impl_projection_tuple!(A, B, C);
impl_projection_tuple!(A, B, C, D);
impl_projection_tuple!(A, B, C, D, F);
impl_projection_tuple!(A, B, C, D, F, G);
impl_projection_tuple!(A, B, C, D, F, G, H);
impl_projection_tuple!(A, B, C, D, F, G, H, I);

#[cfg(test)]
mod tests {
    use super::*;

    struct Account;

    const ID: Column<Account, i64> = Column::new("id", "account_id");
    const NAME: Column<Account, String> = Column::new("name", "account_name");
    const BALANCE: Column<Account, i32> = Column::new("balance", "balance");
    const CREDIT: Column<Account, i32> = Column::new("credit", "credit_limit");

    fn render(expr: Expr<Account>) -> (String, Params) {
        let mut params = Params::new();
        let sql = expr.build_expression(&mut params).unwrap();
        (sql, params)
    }

    #[test]
    fn comparison_binds_under_property_name() {
        let (sql, params) = render(BALANCE.gt(100));
        assert_eq!(sql, "balance > @balance0");
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["balance0"]);
    }

    #[test]
    fn keys_continue_from_existing_params() {
        let mut params = Params::new();
        params.insert("id", 7_i64).unwrap();
        let sql = ID.eq(1).build_expression(&mut params).unwrap();
        assert_eq!(sql, "account_id = @id1");
        assert_eq!(format!("{:?}", params.get("id").unwrap()), "7");
    }

    #[test]
    fn and_joins_flat_or_is_parenthesised() {
        let (sql, _) = render(ID.gt(1) & NAME.like("a%") & (BALANCE.lt(0) | BALANCE.gt(10)));
        assert_eq!(
            sql,
            "account_id > @id0 AND account_name LIKE @name1 AND (balance < @balance2 OR balance > @balance3)"
        );
    }

    #[test]
    fn top_level_or_is_wrapped() {
        let (sql, _) = render(ID.eq(1) | ID.eq(2));
        assert_eq!(sql, "(account_id = @id0 OR account_id = @id1)");
    }

    #[test]
    fn not_wraps_its_operand() {
        let (sql, _) = render(!(ID.eq(1) & NAME.is_null()));
        assert_eq!(sql, "NOT (account_id = @id0 AND account_name IS NULL)");
    }

    #[test]
    fn in_list_and_empty_lists() {
        let (sql, params) = render(ID.in_list([1_i64, 2, 3]));
        assert_eq!(sql, "account_id IN (@id0, @id1, @id2)");
        assert_eq!(params.len(), 3);

        let (sql, params) = render(ID.in_list(Vec::<i64>::new()));
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());

        let (sql, _) = render(ID.not_in(Vec::<i64>::new()));
        assert_eq!(sql, "1=1");
    }

    #[test]
    fn empty_all_and_any() {
        assert_eq!(render(Expr::all(Vec::new())).0, "1=1");
        assert_eq!(render(Expr::any(Vec::new())).0, "1=0");
    }

    #[test]
    fn between_and_column_comparisons() {
        let (sql, _) = render(BALANCE.between(1, 9).and(BALANCE.le_field(CREDIT)));
        assert_eq!(
            sql,
            "balance BETWEEN @balance0 AND @balance1 AND balance <= credit_limit"
        );
    }

    #[test]
    fn arithmetic_is_parenthesised() {
        let (sql, _) = render((BALANCE + 10).gt_field(CREDIT * 2));
        assert_eq!(
            sql,
            "(balance + @balance0) > (credit_limit * @credit1)"
        );
        let (sql, _) = render((BALANCE - CREDIT).lt(0));
        assert_eq!(sql, "(balance - credit_limit) < @balance0");
    }

    #[test]
    fn empty_raw_is_unsupported() {
        let mut params = Params::new();
        let err = Expr::<Account>::raw("  ")
            .build_expression(&mut params)
            .unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedExpression(_)));
    }

    #[test]
    fn top_level_raw_is_parenthesised() {
        let (sql, params) = render(Expr::raw("a = 1 OR b = 2"));
        assert_eq!(sql, "(a = 1 OR b = 2)");
        assert!(params.is_empty());
    }

    #[test]
    fn nested_raw_is_parenthesised() {
        let (sql, _) = render(Expr::raw("a = 1 OR b = 2") & ID.eq(3));
        assert_eq!(sql, "(a = 1 OR b = 2) AND account_id = @id0");
    }

    #[test]
    fn projections_keep_order_and_aliases() {
        let mut params = Params::new();
        let items = (ID, NAME, BALANCE.sum().alias("total"), CREDIT.count_distinct())
            .build_columns(&mut params)
            .unwrap();
        let rendered: Vec<String> = items.iter().map(SelectItem::aliased).collect();
        assert_eq!(
            rendered,
            vec![
                "account_id AS id",
                "account_name AS name",
                "SUM(balance) AS total",
                "COUNT(DISTINCT credit_limit) AS credit",
            ]
        );
    }

    #[test]
    fn empty_vec_projection_is_unsupported() {
        let mut params = Params::new();
        let err = Vec::<Column<Account, i64>>::new()
            .build_columns(&mut params)
            .unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedExpression(_)));
    }

    #[test]
    fn invalid_alias_is_unsupported() {
        let mut params = Params::new();
        let err = ID.alias("x; DROP TABLE y").build_columns(&mut params).unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedExpression(_)));
    }

    #[test]
    fn count_all_renders_count_one() {
        let mut params = Params::new();
        let items = count_all::<Account>().build_columns(&mut params).unwrap();
        assert_eq!(items[0].aliased(), "COUNT(1) AS count");
    }
}
