use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, PTR, TXT};
use hickory_proto::rr::{Name, RData, Record};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use strata_dns_domain::config::{BlockResponse, LocalRecordConfig};
use strata_dns_domain::{CacheEntry, RecordType, ResolveError};

/// Metadata pulled from an upstream response without keeping the decoded
/// message around; the raw bytes are what gets cached.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub rcode: ResponseCode,
    pub truncated: bool,
    pub answer_count: usize,
    pub min_answer_ttl: Option<u32>,
    pub negative_soa_ttl: Option<u32>,
}

impl ResponseMeta {
    pub fn parse(bytes: &[u8]) -> Result<Self, ResolveError> {
        let message = Message::from_vec(bytes)
            .map_err(|e| ResolveError::UpstreamNetwork(format!("unparseable response: {}", e)))?;

        let mut min_answer_ttl = None;
        for record in message.answers() {
            let ttl = record.ttl();
            min_answer_ttl = Some(min_answer_ttl.map_or(ttl, |current: u32| current.min(ttl)));
        }

        let negative_soa_ttl = message.name_servers().iter().find_map(|r| {
            if let RData::SOA(soa) = r.data() {
                Some(soa.minimum().min(r.ttl()))
            } else {
                None
            }
        });

        Ok(Self {
            rcode: message.response_code(),
            truncated: message.truncated(),
            answer_count: message.answers().len(),
            min_answer_ttl,
            negative_soa_ttl,
        })
    }

    pub fn is_server_failure(&self) -> bool {
        matches!(
            self.rcode,
            ResponseCode::ServFail | ResponseCode::Refused | ResponseCode::NotImp
        )
    }

    /// The TTL cached alongside the entry: smallest answer TTL, the
    /// negative TTL for empty responses, or a short floor when the response
    /// carries neither.
    pub fn effective_ttl(&self, fallback: u32) -> u32 {
        self.min_answer_ttl
            .or(self.negative_soa_ttl)
            .unwrap_or(fallback)
    }
}

/// Builds the client-facing messages: replayed cache entries, local-record
/// answers, block answers, and bare error responses.
pub struct ResponseWriter;

impl ResponseWriter {
    /// Replay a cached entry against a live request: fresh id, the client's
    /// own question, answer/authority sections copied with TTLs clamped to
    /// `serve_ttl`.
    pub fn from_cache_entry(
        entry: &CacheEntry,
        request: &Message,
        serve_ttl: u32,
    ) -> Result<Message, ResolveError> {
        let stored = Message::from_vec(&entry.encoded)
            .map_err(|e| ResolveError::Internal(format!("corrupt cache entry: {}", e)))?;

        let mut response = Self::response_shell(request);
        response.set_response_code(stored.response_code());
        for record in stored.answers() {
            let mut record = record.clone();
            record.set_ttl(record.ttl().min(serve_ttl.max(1)));
            response.add_answer(record);
        }
        for record in stored.name_servers() {
            let mut record = record.clone();
            record.set_ttl(record.ttl().min(serve_ttl.max(1)));
            response.add_name_server(record);
        }
        Ok(response)
    }

    /// Authoritative answer for a local record.
    pub fn local_answer(
        records: &[LocalRecordConfig],
        request: &Message,
    ) -> Result<Message, ResolveError> {
        let query_name = Self::query_name(request)?;
        let mut response = Self::response_shell(request);
        response.set_authoritative(true);
        for record in records {
            let rdata = Self::rdata_for(record)?;
            response.add_answer(Record::from_rdata(query_name.clone(), record.ttl, rdata));
        }
        Ok(response)
    }

    /// The configured block answer: unspecified address for A/AAAA,
    /// NXDOMAIN or an empty NOERROR for everything else.
    pub fn block_answer(
        request: &Message,
        qtype: RecordType,
        mode: BlockResponse,
        ttl: u32,
    ) -> Result<Message, ResolveError> {
        let query_name = Self::query_name(request)?;
        let mut response = Self::response_shell(request);
        match qtype {
            RecordType::A => {
                response.add_answer(Record::from_rdata(
                    query_name,
                    ttl,
                    RData::A(A(Ipv4Addr::UNSPECIFIED)),
                ));
            }
            RecordType::AAAA => {
                response.add_answer(Record::from_rdata(
                    query_name,
                    ttl,
                    RData::AAAA(AAAA(Ipv6Addr::UNSPECIFIED)),
                ));
            }
            _ => match mode {
                BlockResponse::Nxdomain => {
                    response.set_response_code(ResponseCode::NXDomain);
                }
                BlockResponse::Empty => {}
            },
        }
        Ok(response)
    }

    /// Error response with no answer sections.
    pub fn error_response(request: &Message, rcode: ResponseCode) -> Message {
        let mut response = Self::response_shell(request);
        response.set_response_code(rcode);
        response
    }

    fn response_shell(request: &Message) -> Message {
        let mut response = Message::new(request.id(), MessageType::Response, OpCode::Query);
        response.set_recursion_desired(request.recursion_desired());
        response.set_recursion_available(true);
        for query in request.queries() {
            response.add_query(query.clone());
        }
        response
    }

    fn query_name(request: &Message) -> Result<Name, ResolveError> {
        request
            .queries()
            .first()
            .map(|q| q.name().clone())
            .ok_or_else(|| ResolveError::ClientError("missing question".into()))
    }

    fn rdata_for(record: &LocalRecordConfig) -> Result<RData, ResolveError> {
        let value = record.value.trim();
        match record.record_type {
            RecordType::A => value
                .parse::<Ipv4Addr>()
                .map(|ip| RData::A(A(ip)))
                .map_err(|e| ResolveError::Internal(format!("local record '{}': {}", value, e))),
            RecordType::AAAA => value
                .parse::<Ipv6Addr>()
                .map(|ip| RData::AAAA(AAAA(ip)))
                .map_err(|e| ResolveError::Internal(format!("local record '{}': {}", value, e))),
            RecordType::CNAME => Name::from_str(value)
                .map(|name| RData::CNAME(CNAME(name)))
                .map_err(|e| ResolveError::Internal(format!("local record '{}': {}", value, e))),
            RecordType::PTR => Name::from_str(value)
                .map(|name| RData::PTR(PTR(name)))
                .map_err(|e| ResolveError::Internal(format!("local record '{}': {}", value, e))),
            RecordType::TXT => Ok(RData::TXT(TXT::new(vec![value.to_string()]))),
            other => Err(ResolveError::Internal(format!(
                "unsupported local record type {}",
                other
            ))),
        }
    }
}
