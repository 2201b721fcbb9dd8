//! Closed string enumerations shared by the spreadsheet columns and the
//! source model.

/// An enumeration whose variants are fixed strings from the spreadsheet
pub trait ClosedEnum: Copy + 'static {
    /// Column-facing name used in error reports
    const NAME: &'static str;

    /// Every variant, in declaration order
    fn all() -> &'static [Self];

    /// The canonical spreadsheet text of this variant
    fn as_str(&self) -> &'static str;

    /// Case-insensitive, whitespace-trimmed lookup
    fn parse_loose(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
    }
}

/// Declares a closed enum with serde names, `Display`, `FromStr` and a
/// [`ClosedEnum`] impl from one `Variant => "text"` table.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $label:tt {
            $( $(#[$vmeta:meta])* $variant:ident => $text:tt ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant, )+
        }

        impl $crate::enums::ClosedEnum for $name {
            const NAME: &'static str = $label;

            fn all() -> &'static [Self] {
                &[ $( $name::$variant, )+ ]
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::enums::ClosedEnum::as_str(self))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::UnknownVariant;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                <$name as $crate::enums::ClosedEnum>::parse_loose(s).ok_or_else(|| {
                    $crate::error::UnknownVariant {
                        enum_name: $label,
                        value: s.to_string(),
                    }
                })
            }
        }
    };
}

pub(crate) use closed_enum;
