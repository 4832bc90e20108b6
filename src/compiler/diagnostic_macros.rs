/// Declares a phase-tagged error enum whose messages interpolate the variant's fields.
///
/// # Syntax
/// ```ignore
/// define_errors! {
///     ErrorType, phase: PhaseName {
///         #[msg = "Error message with {field} interpolation"]
///         #[help = "Optional help text"]
///         VariantName {
///             field1: Type1,
///             span: DisplaySpan,  // required for all variants
///         },
///     }
/// }
/// ```
#[macro_export]
macro_rules! define_errors {
    (
        $error_name:ident, phase: $phase:ident {
            $(
                #[msg = $msg:expr]
                $(#[help = $help:expr])?
                $variant:ident {
                    $($field:ident: $field_ty:ty),* $(,)?
                }
            ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone)]
        pub enum $error_name {
            $(
                $variant {
                    $($field: $field_ty),*
                }
            ),*
        }

        impl $error_name {
            pub fn span(&self) -> &$crate::compiler::tokens::DisplaySpan {
                match self {
                    $(
                        Self::$variant { span, .. } => span,
                    )*
                }
            }

            fn help(&self) -> Option<&'static str> {
                match self {
                    $(
                        Self::$variant { .. } => None $(.or(Some($help)))?,
                    )*
                }
            }
        }

        impl std::fmt::Display for $error_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        #[allow(unused_variables)]
                        Self::$variant { $($field),* } => {
                            write!(f, "{}", $crate::define_errors!(@fill $msg, $($field),*))
                        }
                    )*
                }
            }
        }

        impl std::error::Error for $error_name {}

        impl From<$error_name> for $crate::compiler::error::Diagnostic {
            fn from(err: $error_name) -> Self {
                use $crate::compiler::error::{CompilerPhase, Diagnostic};

                let diagnostic = Diagnostic::error(err.to_string(), CompilerPhase::$phase).with_span(err.span().clone());
                match err.help() {
                    Some(help) => diagnostic.with_help(help),
                    None => diagnostic,
                }
            }
        }
    };

    (@fill $template:expr, $($field:ident),*) => {{
        let mut text = $template.to_string();
        $(
            text = text.replace(
                &format!("{{{}}}", stringify!($field)),
                &format!("{}", $field)
            );
        )*
        text
    }};
}
