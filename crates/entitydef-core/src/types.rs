//! Vector value types

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! vector_type {
    ($(#[$meta:meta])* $name:ident, $len:literal, $($field:ident),+) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(pub $field: f32,)+
        }

        impl $name {
            pub const ZERO: Self = Self { $($field: 0.0,)+ };

            pub const fn new($($field: f32),+) -> Self {
                Self { $($field,)+ }
            }

            pub fn from_array(arr: [f32; $len]) -> Self {
                let [$($field),+] = arr;
                Self { $($field,)+ }
            }

            pub fn to_array(&self) -> [f32; $len] {
                [$(self.$field),+]
            }

            /// Parse whitespace-separated components, e.g. `"1 2.5 -3"`
            pub fn parse_text(text: &str) -> Option<Self> {
                let mut arr = [0.0f32; $len];
                let mut parts = text.split_whitespace();
                for slot in arr.iter_mut() {
                    *slot = parts.next()?.parse().ok()?;
                }
                if parts.next().is_some() {
                    return None;
                }
                Some(Self::from_array(arr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let parts: Vec<String> = self.to_array().iter().map(|c| c.to_string()).collect();
                f.write_str(&parts.join(" "))
            }
        }
    };
}

vector_type!(
    /// A 2D vector
    Vector2, 2, x, y
);

vector_type!(
    /// A 3D vector
    Vector3, 3, x, y, z
);

vector_type!(
    /// A 4D vector
    Vector4, 4, x, y, z, w
);
