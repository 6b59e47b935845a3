use hickory_proto::op::Message;
use hickory_proto::rr::{Record, RecordType};

/// Forces every record TTL in the answer, authority and additional sections
/// into `[min_ttl, max_ttl]`. OPT pseudo-records carry EDNS flags in their
/// TTL field and are left alone.
///
/// Returns the smallest TTL left after clamping, or `min_ttl` when the
/// message holds no eligible record.
pub fn clamp_ttls(message: &mut Message, min_ttl: u32, max_ttl: u32) -> u32 {
    let mut lowest: Option<u32> = None;

    for record in message.answers_mut().iter_mut() {
        observe(&mut lowest, clamp_record(record, min_ttl, max_ttl));
    }
    for record in message.name_servers_mut().iter_mut() {
        observe(&mut lowest, clamp_record(record, min_ttl, max_ttl));
    }
    for record in message.additionals_mut().iter_mut() {
        if record.record_type() == RecordType::OPT {
            continue;
        }
        observe(&mut lowest, clamp_record(record, min_ttl, max_ttl));
    }

    lowest.unwrap_or(min_ttl)
}

fn clamp_record(record: &mut Record, min_ttl: u32, max_ttl: u32) -> u32 {
    let ttl = record.ttl();
    let clamped = if ttl < min_ttl {
        min_ttl
    } else if ttl > max_ttl {
        max_ttl
    } else {
        ttl
    };
    if clamped != ttl {
        record.set_ttl(clamped);
    }
    clamped
}

#[inline]
fn observe(lowest: &mut Option<u32>, ttl: u32) {
    *lowest = Some(lowest.map_or(ttl, |current| current.min(ttl)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata::{A, NS, OPT};
    use hickory_proto::rr::{Name, RData};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn a_record(ttl: u32) -> Record {
        Record::from_rdata(
            Name::from_str("example.com.").unwrap(),
            ttl,
            RData::A(A(Ipv4Addr::new(93, 184, 216, 34))),
        )
    }

    fn ns_record(ttl: u32) -> Record {
        Record::from_rdata(
            Name::from_str("example.com.").unwrap(),
            ttl,
            RData::NS(NS(Name::from_str("a.iana-servers.net.").unwrap())),
        )
    }

    #[test]
    fn test_raises_low_and_lowers_high_ttls() {
        let mut message = Message::new();
        message.add_answer(a_record(10));
        message.add_answer(a_record(100_000));
        message.add_answer(a_record(300));

        let lowest = clamp_ttls(&mut message, 30, 3600);

        let ttls: Vec<u32> = message.answers().iter().map(|r| r.ttl()).collect();
        assert_eq!(ttls, vec![30, 3600, 300]);
        assert_eq!(lowest, 30);
    }

    #[test]
    fn test_authority_and_additional_are_clamped() {
        let mut message = Message::new();
        message.add_name_server(ns_record(5));
        message.add_additional(a_record(90_000));

        let lowest = clamp_ttls(&mut message, 60, 7200);

        assert_eq!(message.name_servers()[0].ttl(), 60);
        assert_eq!(message.additionals()[0].ttl(), 7200);
        assert_eq!(lowest, 60);
    }

    #[test]
    fn test_opt_record_is_untouched() {
        let mut message = Message::new();
        let opt = Record::from_rdata(Name::root(), 0x8000, RData::OPT(OPT::default()));
        message.add_additional(opt);
        message.add_additional(a_record(1));

        let lowest = clamp_ttls(&mut message, 20, 40);

        assert_eq!(message.additionals()[0].ttl(), 0x8000);
        assert_eq!(message.additionals()[1].ttl(), 20);
        assert_eq!(lowest, 20);
    }

    #[test]
    fn test_empty_message_returns_min_ttl() {
        let mut message = Message::new();
        assert_eq!(clamp_ttls(&mut message, 45, 900), 45);
    }

    #[test]
    fn test_lowest_is_measured_after_clamping() {
        let mut message = Message::new();
        message.add_answer(a_record(500));
        message.add_answer(a_record(200));

        assert_eq!(clamp_ttls(&mut message, 10, 100), 100);
    }

    #[test]
    fn test_record_order_is_preserved() {
        let mut message = Message::new();
        message.add_answer(a_record(1));
        message.add_answer(ns_record(2));
        message.add_answer(a_record(3));

        clamp_ttls(&mut message, 0, 10);

        let types: Vec<RecordType> = message.answers().iter().map(|r| r.record_type()).collect();
        assert_eq!(types, vec![RecordType::A, RecordType::NS, RecordType::A]);
    }
}
