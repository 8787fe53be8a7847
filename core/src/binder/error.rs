use thiserror::Error;

use crate::api::{Diagnostic, Severity};
use crate::syntax::Span;
use crate::syntax::number_literal::NumberLiteralError;

/// A binding failure. Binding stops at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct BindError {
    pub kind: BindErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindErrorKind {
    #[error("the name '{0}' does not exist in the current context")]
    UnknownName(String),
    #[error("the type or namespace '{0}' could not be found")]
    UnknownType(String),
    #[error("'{ty}' does not contain a definition for '{member}'")]
    UnknownMember {
        ty: String,
        member: String,
        available: Vec<String>,
    },
    #[error("no overload of '{name}' accepts arguments ({arguments})")]
    NoOverload { name: String, arguments: String },
    #[error("the call to '{name}' is ambiguous between {candidates}")]
    Ambiguous { name: String, candidates: String },
    #[error("cannot implicitly convert type '{from}' to '{to}'")]
    CannotConvert { from: String, to: String },
    #[error("cannot convert type '{from}' to '{to}'")]
    InvalidCast { from: String, to: String },
    #[error("operator '{op}' cannot be applied to operands of type '{left}' and '{right}'")]
    BinaryNotApplicable {
        op: String,
        left: String,
        right: String,
    },
    #[error("operator '{op}' cannot be applied to operand of type '{operand}'")]
    UnaryNotApplicable { op: String, operand: String },
    #[error("non-invocable member '{0}' cannot be used like a method")]
    NotInvocable(String),
    #[error("cannot apply indexing to an expression of type '{0}'")]
    NotIndexable(String),
    #[error("{0}")]
    InvalidLiteral(NumberLiteralError),
    #[error("cannot infer the type of the lambda expression")]
    LambdaWithoutTarget,
    #[error("delegate '{delegate}' does not take {found} arguments")]
    LambdaArity { delegate: String, found: usize },
    #[error("operator '?' cannot be applied to operand of type '{0}'")]
    NullConditionalOnValueType(String),
    #[error("the type arguments for method '{0}' cannot be inferred from the usage")]
    CannotInferTypeArguments(String),
    #[error("'{0}' is a type or namespace but is used like a variable")]
    NotAValue(String),
    #[error("member '{member}' cannot be accessed with {access}")]
    StaticMismatch { member: String, access: &'static str },
    #[error("'{0}' does not have a matching constructor")]
    NoConstructor(String),
    #[error("property or indexer '{0}' cannot be assigned to")]
    ReadOnlyMember(String),
    #[error("the as operator must be used with a reference type or nullable type ('{0}' is a non-nullable value type)")]
    InvalidAs(String),
    #[error("{0} is not supported")]
    Unsupported(String),
    #[error("a parameter named '{0}' is already declared")]
    DuplicateParameter(String),
    #[error("expression of type 'void' has no value")]
    VoidValue,
    #[error("no best type found for the conditional expression between '{0}' and '{1}'")]
    NoCommonType(String, String),
}

impl BindError {
    pub fn new(kind: BindErrorKind, span: Span) -> Self {
        BindError { kind, span }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, help) = match &self.kind {
            BindErrorKind::UnknownName(_) => ("B001", Some("check the spelling or declare a parameter".to_string())),
            BindErrorKind::UnknownType(_) => ("B002", Some("register the type with the resolver".to_string())),
            BindErrorKind::UnknownMember { available, .. } => (
                "B003",
                (!available.is_empty()).then(|| format!("available members: {}", available.join(", "))),
            ),
            BindErrorKind::NoOverload { .. } => ("B004", None),
            BindErrorKind::Ambiguous { .. } => ("B005", Some("add a cast to select an overload".to_string())),
            BindErrorKind::CannotConvert { .. } => ("B006", Some("an explicit conversion may exist".to_string())),
            BindErrorKind::InvalidCast { .. } => ("B007", None),
            BindErrorKind::BinaryNotApplicable { .. } => ("B008", None),
            BindErrorKind::UnaryNotApplicable { .. } => ("B009", None),
            BindErrorKind::NotInvocable(_) => ("B010", None),
            BindErrorKind::NotIndexable(_) => ("B011", None),
            BindErrorKind::InvalidLiteral(_) => ("B012", None),
            BindErrorKind::LambdaWithoutTarget => (
                "B013",
                Some("give the lambda parameters explicit types".to_string()),
            ),
            BindErrorKind::LambdaArity { .. } => ("B014", None),
            BindErrorKind::NullConditionalOnValueType(_) => ("B015", None),
            BindErrorKind::CannotInferTypeArguments(_) => (
                "B016",
                Some("specify the type arguments explicitly".to_string()),
            ),
            BindErrorKind::NotAValue(_) => ("B017", None),
            BindErrorKind::StaticMismatch { .. } => ("B018", None),
            BindErrorKind::NoConstructor(_) => ("B019", None),
            BindErrorKind::ReadOnlyMember(_) => ("B020", None),
            BindErrorKind::InvalidAs(_) => ("B021", None),
            BindErrorKind::Unsupported(_) => ("B022", None),
            BindErrorKind::DuplicateParameter(_) => ("B023", None),
            BindErrorKind::VoidValue => ("B024", None),
            BindErrorKind::NoCommonType(..) => ("B025", None),
        };
        Diagnostic {
            severity: Severity::Error,
            message: self.kind.to_string(),
            span: self.span.clone(),
            related: Vec::new(),
            help,
            code: Some(code.to_string()),
        }
    }
}
