//! COPY protocol backend messages.

use crate::error::Result;
use crate::protocol::codec::Cursor;
use crate::protocol::types::FormatCode;

/// Body shared by CopyInResponse, CopyOutResponse and CopyBothResponse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResponse {
    /// Overall format is binary (otherwise textual)
    pub binary: bool,
    /// Per-column format codes
    pub column_formats: Vec<FormatCode>,
}

impl CopyResponse {
    pub(crate) fn parse(cur: &mut Cursor<'_>) -> Result<Self> {
        let binary = cur.read_u8()? != 0;

        let num_columns = cur.read_i16()?;
        if num_columns < 0 {
            return Err(cur.error(format!("negative column count {num_columns}")));
        }
        let mut column_formats = Vec::with_capacity(num_columns as usize);
        for _ in 0..num_columns {
            column_formats.push(FormatCode::from_u16(cur.read_u16()?));
        }

        Ok(Self {
            binary,
            column_formats,
        })
    }
}
