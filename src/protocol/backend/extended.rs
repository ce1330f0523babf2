//! Extended query protocol backend messages.
//!
//! ParseComplete, BindComplete, CloseComplete, NoData and PortalSuspended
//! have empty payloads and are decoded directly in [`super::BackendMessage`].

use crate::error::Result;
use crate::protocol::codec::Cursor;
use crate::protocol::types::Oid;

/// Parse a ParameterDescription payload into the parameter type OIDs.
pub(crate) fn parse_parameter_description(cur: &mut Cursor<'_>) -> Result<Vec<Oid>> {
    let num_params = cur.read_i16()?;
    if num_params < 0 {
        return Err(cur.error(format!("negative parameter count {num_params}")));
    }

    let mut param_oids = Vec::with_capacity(num_params as usize);
    for _ in 0..num_params {
        param_oids.push(cur.read_u32()?);
    }
    Ok(param_oids)
}
