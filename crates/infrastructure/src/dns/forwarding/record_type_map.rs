use strata_dns_domain::RecordType;

/// Conversions between the domain record type and hickory's.
pub struct RecordTypeMapper;

impl RecordTypeMapper {
    #[inline]
    pub fn to_hickory(record_type: RecordType) -> hickory_proto::rr::RecordType {
        hickory_proto::rr::RecordType::from(record_type.to_u16())
    }

    #[inline]
    pub fn from_hickory(record_type: hickory_proto::rr::RecordType) -> RecordType {
        RecordType::from_u16(u16::from(record_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_hickory() {
        for rt in [RecordType::A, RecordType::AAAA, RecordType::PTR] {
            assert_eq!(
                RecordTypeMapper::from_hickory(RecordTypeMapper::to_hickory(rt)),
                rt
            );
        }
    }
}
