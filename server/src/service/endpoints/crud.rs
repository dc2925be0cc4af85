//! The five repository operations, for any record type.

use serde_json::Value;

use crate::persistence::{PersistenceError, Record, Repository};
use crate::service::envelope::DispatchError;
use crate::service::parsers::{parse_filter, parse_id, parse_payload, parse_update, Op};

pub async fn handle<T, R>(repo: &R, op: Op, payload: Value) -> Result<Value, DispatchError>
where
    T: Record,
    R: Repository<T>,
{
    match op {
        Op::Create => {
            let draft: T::Draft = parse_payload(payload)?;
            to_data(&repo.create(draft).await?)
        }
        Op::Read => {
            let id = parse_id(&payload)?;
            to_data(&repo.read(&id).await?)
        }
        Op::Update => {
            let (id, data) = parse_update(payload)?;
            let patch: T::Patch = parse_payload(data)?;
            to_data(&repo.update(&id, patch).await?)
        }
        Op::Delete => {
            let id = parse_id(&payload)?;
            repo.delete(&id).await?;
            Ok(Value::Null)
        }
        Op::List => {
            let filter = parse_filter(payload)?;
            to_data(&repo.list(&filter).await?)
        }
    }
}

pub(crate) fn to_data<S: serde::Serialize>(value: &S) -> Result<Value, DispatchError> {
    Ok(serde_json::to_value(value).map_err(PersistenceError::from)?)
}
