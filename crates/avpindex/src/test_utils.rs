use crate::model::{Avp, Message};
use crate::path::AvpId;
use crate::value::AvpValue;
use chrono::{TimeZone, Utc};
use std::net::{IpAddr, Ipv4Addr};

/// Dictionary ids used by [`credit_control_request`].
pub mod ids {
    use crate::path::AvpId;

    pub const SESSION_ID: AvpId = AvpId::ietf(263);
    pub const ORIGIN_HOST: AvpId = AvpId::ietf(264);
    pub const EVENT_TIMESTAMP: AvpId = AvpId::ietf(55);
    pub const CC_REQUEST_TYPE: AvpId = AvpId::ietf(416);
    pub const CC_REQUEST_NUMBER: AvpId = AvpId::ietf(415);
    pub const SUBSCRIPTION_ID: AvpId = AvpId::ietf(443);
    pub const SUBSCRIPTION_ID_TYPE: AvpId = AvpId::ietf(450);
    pub const SUBSCRIPTION_ID_DATA: AvpId = AvpId::ietf(444);
    pub const MSCC: AvpId = AvpId::ietf(456);
    pub const RATING_GROUP: AvpId = AvpId::ietf(432);
    pub const REQUESTED_SERVICE_UNIT: AvpId = AvpId::ietf(437);
    pub const USED_SERVICE_UNIT: AvpId = AvpId::ietf(446);
    pub const CC_INPUT_OCTETS: AvpId = AvpId::ietf(412);
    pub const CC_OUTPUT_OCTETS: AvpId = AvpId::ietf(414);
    pub const CC_TOTAL_OCTETS: AvpId = AvpId::ietf(421);
    pub const SERVICE_INFORMATION: AvpId = AvpId::new(10415, 873);
    pub const PS_INFORMATION: AvpId = AvpId::new(10415, 874);
    pub const CHARGING_ID: AvpId = AvpId::new(10415, 2);
    pub const SGSN_ADDRESS: AvpId = AvpId::new(10415, 1228);
}

pub const CREDIT_CONTROL: u32 = 272;
pub const DCCA_APPLICATION: u32 = 4;

fn used_service_unit(input: u64, output: u64) -> Avp {
    Avp::grouped(
        ids::USED_SERVICE_UNIT,
        "Used-Service-Unit",
        vec![
            Avp::new(ids::CC_INPUT_OCTETS, "CC-Input-Octets", AvpValue::Unsigned64(input)),
            Avp::new(ids::CC_OUTPUT_OCTETS, "CC-Output-Octets", AvpValue::Unsigned64(output)),
            Avp::new(
                ids::CC_TOTAL_OCTETS,
                "CC-Total-Octets",
                AvpValue::Unsigned64(input + output),
            ),
        ],
    )
}

fn mscc(rating_group: u32, usu: Avp) -> Avp {
    Avp::grouped(
        ids::MSCC,
        "Multiple-Services-Credit-Control",
        vec![
            Avp::grouped(ids::REQUESTED_SERVICE_UNIT, "Requested-Service-Unit", vec![]),
            usu,
            Avp::new(ids::RATING_GROUP, "Rating-Group", AvpValue::Unsigned32(rating_group)),
        ],
    )
}

/// An update CCR with two MSCC instances (rating groups 100 and 200) and 3GPP
/// PS-Information.
pub fn credit_control_request() -> Message {
    let avps = vec![
        Avp::new(
            ids::SESSION_ID,
            "Session-Id",
            AvpValue::Utf8String("pgw.example.net;1876543210;1".into()),
        ),
        Avp::new(
            ids::ORIGIN_HOST,
            "Origin-Host",
            AvpValue::DiameterIdentity("pgw.example.net".into()),
        ),
        Avp::new(ids::CC_REQUEST_TYPE, "CC-Request-Type", AvpValue::Enumerated(2)),
        Avp::new(ids::CC_REQUEST_NUMBER, "CC-Request-Number", AvpValue::Unsigned32(1)),
        Avp::new(
            ids::EVENT_TIMESTAMP,
            "Event-Timestamp",
            AvpValue::Time(Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap()),
        ),
        Avp::grouped(
            ids::SUBSCRIPTION_ID,
            "Subscription-Id",
            vec![
                Avp::new(ids::SUBSCRIPTION_ID_TYPE, "Subscription-Id-Type", AvpValue::Enumerated(1)),
                Avp::new(
                    ids::SUBSCRIPTION_ID_DATA,
                    "Subscription-Id-Data",
                    AvpValue::Utf8String("001010123456789".into()),
                ),
            ],
        ),
        mscc(100, used_service_unit(500, 1_000)),
        mscc(200, used_service_unit(1_000, 3_000)),
        Avp::grouped(
            ids::SERVICE_INFORMATION,
            "Service-Information",
            vec![Avp::grouped(
                ids::PS_INFORMATION,
                "PS-Information",
                vec![
                    Avp::new(ids::CHARGING_ID, "3GPP-Charging-Id", AvpValue::Unsigned32(0x2a)),
                    Avp::new(
                        ids::SGSN_ADDRESS,
                        "SGSN-Address",
                        AvpValue::Address(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))),
                    ),
                ],
            )],
        ),
    ];
    Message::new(CREDIT_CONTROL, DCCA_APPLICATION, avps)
}

/// A chain of `depth` nested groups (ids 1000, 1001, …) around a single Unsigned32.
pub fn nested(depth: u32, leaf: AvpId, value: u32) -> Avp {
    let mut avp = Avp::new(leaf, "Leaf", AvpValue::Unsigned32(value));
    for level in (0..depth).rev() {
        avp = Avp::grouped(AvpId::ietf(1000 + level), format!("Level-{}", level), vec![avp]);
    }
    avp
}
