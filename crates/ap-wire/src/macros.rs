//! Declarative message schema.

/// Declare a wire body once: the struct definition, its field order and its
/// codec impls all come from the same field list.
///
/// ```rust
/// ap_wire::wire_message! {
///     /// Example body.
///     pub struct Ping {
///         pub opid: u64,
///         pub note: String,
///     }
/// }
/// ```
///
/// An optional `=> (category, operation)` suffix also implements
/// [`crate::WireMessage`] so the struct can be framed into a packet.
#[macro_export]
macro_rules! wire_message {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
        $(=> ($category:expr, $operation:expr))?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::codec::WireEncode for $name {
            #[allow(unused_variables)]
            fn encode(&self, buf: &mut $crate::__bytes::BytesMut) {
                $( $crate::codec::WireEncode::encode(&self.$field, buf); )*
            }
        }

        impl $crate::codec::WireDecode for $name {
            #[allow(unused_variables)]
            fn decode<B: $crate::__bytes::Buf>(
                buf: &mut B,
            ) -> ::core::result::Result<Self, $crate::WireError> {
                Ok(Self {
                    $( $field: $crate::codec::WireDecode::decode(buf)?, )*
                })
            }
        }

        $(
            impl $crate::packet::WireMessage for $name {
                const CATEGORY: u16 = $category;
                const OPERATION: u16 = $operation;
            }
        )?
    };
}
