/// Defines a closed set of keywords as an enum, together with its spelling table,
/// a [`Parse`] implementation that accepts exactly those symbols and a [`Print`]
/// implementation that writes them back.
///
/// [`Parse`]: crate::parser::Parse
/// [`Print`]: crate::printer::Print
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident => $atom:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$variant_meta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            #[allow(dead_code)]
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Looks up the variant spelled `keyword`.
            pub fn from_keyword(keyword: &str) -> Option<Self> {
                match keyword {
                    $($atom => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// The on-disk spelling of the keyword.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $atom),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl<C> $crate::parser::Parse<C> for $name {
            fn parse(parser: &mut $crate::parser::Parser<'_, C>) -> $crate::parser::Result<Self> {
                parser.symbol_with(Self::from_keyword, concat!("one of" $(, " `", $atom, "`")+))
            }
        }

        impl $crate::printer::Print for $name {
            fn print<P: $crate::printer::Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
                printer.symbol(self.as_str())
            }
        }
    };
}

pub(crate) use keyword_enum;
