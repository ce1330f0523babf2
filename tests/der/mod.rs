//! DER builders for minimal X.509 certificate shells.

/// DER tag-length-value.
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.extend_from_slice(&[0x81, len as u8]);
    } else {
        out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

/// DER OBJECT IDENTIFIER from dotted form.
pub fn oid(dotted: &str) -> Vec<u8> {
    let arcs: Vec<u64> = dotted.split('.').map(|a| a.parse().unwrap()).collect();
    let mut content = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for &arc in &arcs[2..] {
        let mut groups = vec![(arc & 0x7f) as u8];
        let mut rest = arc >> 7;
        while rest > 0 {
            groups.push((rest & 0x7f) as u8 | 0x80);
            rest >>= 7;
        }
        groups.reverse();
        content.extend_from_slice(&groups);
    }
    tlv(0x06, &content)
}

/// Minimal certificate shell whose signatureAlgorithm is `algorithm`.
pub fn certificate(algorithm: &[u8]) -> Vec<u8> {
    let tbs = tlv(
        0x30,
        &[
            tlv(0xa0, &tlv(0x02, &[2])),
            tlv(0x02, &[0x10, 0x20, 0x30]),
            tlv(0x30, &vec![0x41; 200]),
        ]
        .concat(),
    );
    let signature = tlv(0x03, &[0, 0xde, 0xad, 0xbe, 0xef]);
    tlv(0x30, &[tbs, tlv(0x30, algorithm), signature].concat())
}

/// Certificate signed with the algorithm `dotted` (NULL parameters).
pub fn certificate_with_oid(dotted: &str) -> Vec<u8> {
    certificate(&[oid(dotted), vec![0x05, 0x00]].concat())
}

/// RSASSA-PSS certificate whose parameters name `hash_oid`.
pub fn pss_certificate(hash_oid: &str) -> Vec<u8> {
    let params = tlv(
        0x30,
        &tlv(0xa0, &tlv(0x30, &[oid(hash_oid), vec![0x05, 0x00]].concat())),
    );
    certificate(&[oid("1.2.840.113549.1.1.10"), params].concat())
}
