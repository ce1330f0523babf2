//! Query-related backend messages.

use bytes::Bytes;
use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE, U16 as U16BE, U32 as U32BE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::Result;
use crate::protocol::codec::Cursor;
use crate::protocol::types::{FormatCode, Oid};

/// Fixed-size tail of a field description (18 bytes).
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct FieldDescriptionTail {
    table_oid: U32BE,
    column_id: I16BE,
    type_oid: U32BE,
    type_size: I16BE,
    type_modifier: I32BE,
    format: U16BE,
}

/// Column descriptor within a RowDescription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Table OID (0 if not a table column)
    pub table_oid: Oid,
    /// Column attribute number (0 if not a table column)
    pub column_id: i16,
    /// Data type OID
    pub type_oid: Oid,
    /// Type size (negative for variable-length types)
    pub type_size: i16,
    /// Type modifier (type-specific)
    pub type_modifier: i32,
    /// Format of the column values
    pub format: FormatCode,
}

impl Field {
    /// Returns true if the type has no fixed size.
    pub fn is_variable_length(&self) -> bool {
        self.type_size < 0
    }
}

/// RowDescription message - describes the columns in a result set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowDescription {
    /// Column descriptors, in column order
    pub fields: Vec<Field>,
}

impl RowDescription {
    pub(crate) fn parse(cur: &mut Cursor<'_>) -> Result<Self> {
        let num_fields = cur.read_i16()?;
        if num_fields < 0 {
            return Err(cur.error(format!("negative field count {num_fields}")));
        }

        let mut fields = Vec::with_capacity(num_fields as usize);
        for _ in 0..num_fields {
            let name = cur.read_cstr()?.to_string();
            let tail: FieldDescriptionTail = cur.read_struct("FieldDescription")?;
            fields.push(Field {
                name,
                table_oid: tail.table_oid.get(),
                column_id: tail.column_id.get(),
                type_oid: tail.type_oid.get(),
                type_size: tail.type_size.get(),
                type_modifier: tail.type_modifier.get(),
                format: FormatCode::from_u16(tail.format.get()),
            });
        }

        Ok(Self { fields })
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over field descriptions.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }
}

/// DataRow message - contains a single row of raw column values.
///
/// Values are slices of the frame payload; interpreting them is left to the
/// caller together with the matching [`Field`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataRow {
    /// Column values; `None` represents NULL
    pub fields: Vec<Option<Bytes>>,
}

impl DataRow {
    pub(crate) fn parse(cur: &mut Cursor<'_>, payload: &Bytes) -> Result<Self> {
        let num_columns = cur.read_i16()?;
        if num_columns < 0 {
            return Err(cur.error(format!("negative column count {num_columns}")));
        }

        let mut fields = Vec::with_capacity(num_columns as usize);
        for _ in 0..num_columns {
            let len = cur.read_i32()?;
            match len {
                -1 => fields.push(None),
                len if len < 0 => {
                    return Err(cur.error(format!("invalid column length {len}")));
                }
                len => {
                    let start = cur.position();
                    cur.read_bytes(len as usize)?;
                    fields.push(Some(payload.slice(start..start + len as usize)));
                }
            }
        }

        Ok(Self { fields })
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get a column value by index.
    ///
    /// Returns `Some(None)` if the column is NULL, `None` if out of range.
    pub fn get(&self, index: usize) -> Option<Option<&[u8]>> {
        self.fields.get(index).map(|value| value.as_deref())
    }
}

/// CommandComplete message - indicates successful completion of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandComplete {
    /// Command tag (e.g., "SELECT 5", "INSERT 0 1", "UPDATE 10")
    pub tag: String,
}

impl CommandComplete {
    pub(crate) fn parse(cur: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            tag: cur.read_cstr()?.to_string(),
        })
    }

    /// Parse the number of rows affected from the command tag.
    ///
    /// Returns `Some(count)` for commands like SELECT, INSERT, UPDATE, DELETE.
    /// Returns `None` for other commands or parse failures.
    pub fn rows_affected(&self) -> Option<u64> {
        let parts: Vec<&str> = self.tag.split_whitespace().collect();

        match parts.as_slice() {
            ["INSERT", _oid, count] => count.parse().ok(),
            ["SELECT" | "UPDATE" | "DELETE" | "MERGE" | "COPY" | "MOVE" | "FETCH", count] => {
                count.parse().ok()
            }
            _ => None,
        }
    }

    /// Get the command name from the tag.
    pub fn command(&self) -> Option<&str> {
        self.tag.split_whitespace().next()
    }
}
