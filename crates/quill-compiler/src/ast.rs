//! AST vocabulary
//!
//! The boundary with the parser: an immutable tagged tree rooted at a
//! module (a statement list). The compiler only ever reads these nodes.
//! The enums are closed, so the translator's per-tag dispatch is checked
//! for exhaustiveness at compile time; an unknown construct cannot exist.

pub use quill_core::object::{BinOp, CmpOp, UnaryOp};

/// Statement nodes.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Expression evaluated for its side effects.
    Expr(Expr),
    /// `t1 = t2 = ... = value`; parallel tuple targets arrive already
    /// flattened by the parser as `Target::Tuple`.
    Assign { targets: Vec<Target>, value: Expr },
    /// `target op= value`.
    AugAssign { target: Target, op: BinOp, value: Expr },
    /// `del t1, t2, ...`.
    Del(Vec<Target>),
    /// `print a, b` / `print a,` (trailing comma suppresses the newline).
    /// A destination stream is accepted syntactically but not honored.
    Print {
        items: Vec<Expr>,
        trailing_comma: bool,
        dest: Option<Expr>,
    },
    /// `if`/`elif` arms plus an optional `else` suite.
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
    },
    /// `while test: body else: orelse`.
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    /// `for target in iter: body else: orelse`.
    For {
        target: Target,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    Break,
    Continue,
    Pass,
    Return(Option<Expr>),
    /// `yield value`; only legal inside a function body, where it marks
    /// the body for the generator rewrite.
    Yield(Expr),
    /// `global name, ...`.
    Global(Vec<String>),
    FuncDef(FuncDef),
    ClassDef {
        name: String,
        bases: Vec<Expr>,
        body: Vec<Stmt>,
    },
    /// `raise exc` / `raise exc, arg` / `raise exc, arg, traceback`
    /// (the traceback is accepted and ignored).
    Raise {
        exc: Expr,
        arg: Option<Expr>,
        traceback: Option<Expr>,
    },
    TryExcept {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
    },
    TryFinally {
        body: Vec<Stmt>,
        finalizer: Vec<Stmt>,
    },
    Assert {
        test: Expr,
        message: Option<Expr>,
    },
    /// `exec source in globals, locals`.
    Exec {
        source: Expr,
        globals: Option<Expr>,
        locals: Option<Expr>,
    },
}

/// A function definition (`def`).
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub name: String,
    pub params: Params,
    pub body: Vec<Stmt>,
    /// Decorator expressions in source order; applied right-to-left.
    pub decorators: Vec<Expr>,
}

/// One `except` clause. `types: None` is the bare clause (matches
/// everything language-level; must be last).
#[derive(Debug, Clone)]
pub struct ExceptHandler {
    pub types: Option<Expr>,
    pub binding: Option<Target>,
    pub body: Vec<Stmt>,
}

/// Formal parameter list.
#[derive(Debug, Clone, Default)]
pub struct Params {
    /// Required positional parameters, possibly tuple-shaped.
    pub required: Vec<Param>,
    /// Keyword parameters with their default expressions.
    pub keywords: Vec<(String, Expr)>,
    /// `*rest` parameter collecting excess positional arguments.
    pub rest_pos: Option<String>,
    /// `**rest` parameter collecting excess keyword arguments.
    pub rest_kw: Option<String>,
}

/// A required parameter: a plain name or a tuple shape to destructure at
/// function entry.
#[derive(Debug, Clone)]
pub enum Param {
    Name(String),
    Tuple(Vec<Param>),
}

/// Assignment/deletion targets.
#[derive(Debug, Clone)]
pub enum Target {
    Name(String),
    Attribute { object: Expr, name: String },
    Subscript { object: Expr, index: Expr },
    Tuple(Vec<Target>),
}

/// Expression nodes.
#[derive(Debug, Clone)]
pub enum Expr {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    /// `[item for t1 in e1 if c1 for t2 in e2 ...]`.
    ListComp {
        item: Box<Expr>,
        clauses: Vec<CompClause>,
    },
    Attribute {
        object: Box<Expr>,
        name: String,
    },
    Subscript {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<(String, Expr)>,
        star_args: Option<Box<Expr>>,
        star_kwargs: Option<Box<Expr>>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    BoolOp {
        op: BoolOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Lambda {
        params: Params,
        body: Box<Expr>,
    },
}

/// `and` / `or`, short-circuiting on truthiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

/// One `for target in iter [if cond]*` clause of a comprehension.
#[derive(Debug, Clone)]
pub struct CompClause {
    pub target: Target,
    pub iter: Expr,
    pub conds: Vec<Expr>,
}

/// Render an expression back to source-like text. Used for the assertion
/// failure message when no explicit message is supplied.
pub fn render_expr(e: &Expr) -> String {
    match e {
        Expr::Name(n) => n.clone(),
        Expr::Int(i) => i.to_string(),
        Expr::Float(f) => format!("{:?}", f),
        Expr::Str(s) => format!("'{}'", s),
        Expr::Tuple(items) => {
            let parts: Vec<String> = items.iter().map(render_expr).collect();
            format!("({})", parts.join(", "))
        }
        Expr::List(items) => {
            let parts: Vec<String> = items.iter().map(render_expr).collect();
            format!("[{}]", parts.join(", "))
        }
        Expr::Dict(pairs) => {
            let parts: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{}: {}", render_expr(k), render_expr(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Expr::ListComp { item, .. } => format!("[{} for ...]", render_expr(item)),
        Expr::Attribute { object, name } => format!("{}.{}", render_expr(object), name),
        Expr::Subscript { object, index } => {
            format!("{}[{}]", render_expr(object), render_expr(index))
        }
        Expr::Call { callee, .. } => format!("{}(...)", render_expr(callee)),
        Expr::Binary { op, left, right } => format!(
            "{} {} {}",
            render_expr(left),
            op.symbol(),
            render_expr(right)
        ),
        Expr::Unary { op, operand } => format!("{}{}", op.symbol(), render_expr(operand)),
        Expr::Compare { op, left, right } => format!(
            "{} {} {}",
            render_expr(left),
            op.symbol(),
            render_expr(right)
        ),
        Expr::BoolOp { op, left, right } => format!(
            "{} {} {}",
            render_expr(left),
            match op {
                BoolOpKind::And => "and",
                BoolOpKind::Or => "or",
            },
            render_expr(right)
        ),
        Expr::Lambda { .. } => "lambda ...".to_string(),
    }
}

impl Params {
    /// Flattened names of all parameters in frame order: required (with a
    /// synthetic name for each tuple shape), then keyword, then the two
    /// rest parameters. Tuple shapes contribute only their synthetic name;
    /// their component names become ordinary body locals through the
    /// destructuring assignment the compiler prepends.
    pub fn frame_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (i, p) in self.required.iter().enumerate() {
            match p {
                Param::Name(n) => names.push(n.clone()),
                Param::Tuple(_) => names.push(synthetic_param_name(i)),
            }
        }
        for (n, _) in &self.keywords {
            names.push(n.clone());
        }
        if let Some(n) = &self.rest_pos {
            names.push(n.clone());
        }
        if let Some(n) = &self.rest_kw {
            names.push(n.clone());
        }
        names
    }
}

/// Name of the synthetic parameter standing in for a tuple-shaped formal
/// at position `i`. Starts with a dot so it can never collide with a
/// source-level identifier.
pub fn synthetic_param_name(i: usize) -> String {
    format!(".{}", i)
}
