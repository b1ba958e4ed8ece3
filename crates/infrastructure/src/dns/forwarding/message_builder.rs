//! Constructs DNS query messages in wire format using `hickory-proto`,
//! giving the upstream client full control over id and flags.

use super::record_type_map::RecordTypeMapper;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::Name;
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::str::FromStr;
use strata_dns_domain::{Question, ResolveError};

pub struct MessageBuilder;

impl MessageBuilder {
    /// Build a recursive query for `question` and serialize it. Returns the
    /// message id for response matching alongside the bytes.
    pub fn build_query(question: &Question) -> Result<(u16, Vec<u8>), ResolveError> {
        let name = Name::from_str(&question.name)
            .map_err(|e| ResolveError::InvalidName(format!("'{}': {}", question.name, e)))?;

        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(RecordTypeMapper::to_hickory(question.qtype));
        query.set_query_class(hickory_proto::rr::DNSClass::IN);

        let id = fastrand::u16(..);
        let mut message = Message::new(id, MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        let bytes = Self::serialize(&message)?;
        Ok((id, bytes))
    }

    fn serialize(message: &Message) -> Result<Vec<u8>, ResolveError> {
        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);
        message
            .emit(&mut encoder)
            .map_err(|e| ResolveError::Internal(format!("failed to serialize query: {}", e)))?;
        Ok(buf)
    }
}
