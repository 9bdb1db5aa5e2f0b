// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Message payload decoding
//
// The reader treats payload decoding as a collaborator: given a
// connection's type signature, definition text and the raw bytes of one
// message, produce an ordered list of named scalar or tuple values.
// `Ros1Decoder` is the built-in implementation driven by the definition
// text carried in every connection record.

pub mod ros1;
pub mod schema;
pub mod value;

pub use ros1::Ros1Decoder;
pub use schema::{ArrayKind, FieldDef, FieldType, MessageSchema, Primitive};
pub use value::{find, find_scalar, DecodedField, FieldValue, Value};

use crate::error::Result;

/// Turns raw message bytes into ordered field values
///
/// Implementations must be deterministic for identical inputs.
pub trait MessageDecoder: Send {
    fn decode(
        &mut self,
        type_signature: &str,
        definition: &str,
        data: &[u8],
    ) -> Result<Vec<DecodedField>>;
}

impl<D: MessageDecoder + ?Sized> MessageDecoder for Box<D> {
    fn decode(
        &mut self,
        type_signature: &str,
        definition: &str,
        data: &[u8],
    ) -> Result<Vec<DecodedField>> {
        (**self).decode(type_signature, definition, data)
    }
}
