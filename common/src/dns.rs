use std::net::Ipv4Addr;

const HEADER_LEN: usize = 12;
const TYPE_A: u16 = 1;
const TYPE_ANY: u16 = 255;
const CLASS_IN: u16 = 1;
const ANSWER_TTL_SECS: u32 = 60;
const MAX_LABEL_LEN: u8 = 63;

// None for anything that is not a standard query.
pub fn redirect_response(query: &[u8], addr: Ipv4Addr) -> Option<Vec<u8>> {
    if query.len() < HEADER_LEN {
        return None;
    }
    let flags = u16::from_be_bytes([query[2], query[3]]);
    let is_response = flags & 0x8000 != 0;
    let opcode = (flags >> 11) & 0x0F;
    let questions = u16::from_be_bytes([query[4], query[5]]);
    if is_response || opcode != 0 || questions == 0 {
        return None;
    }

    let question_end = question_end(query)?;
    let qtype = u16::from_be_bytes([query[question_end - 4], query[question_end - 3]]);
    let qclass = u16::from_be_bytes([query[question_end - 2], query[question_end - 1]]);
    let answer = matches!(qtype, TYPE_A | TYPE_ANY) && qclass == CLASS_IN;

    let mut reply = Vec::with_capacity(question_end + 16);
    reply.extend_from_slice(&query[0..2]);
    let recursion_desired = flags & 0x0100;
    reply.extend_from_slice(&(0x8080 | recursion_desired).to_be_bytes());
    reply.extend_from_slice(&1u16.to_be_bytes());
    reply.extend_from_slice(&u16::from(answer).to_be_bytes());
    reply.extend_from_slice(&[0, 0, 0, 0]);
    reply.extend_from_slice(&query[HEADER_LEN..question_end]);

    if answer {
        reply.extend_from_slice(&[0xC0, 0x0C]);
        reply.extend_from_slice(&TYPE_A.to_be_bytes());
        reply.extend_from_slice(&CLASS_IN.to_be_bytes());
        reply.extend_from_slice(&ANSWER_TTL_SECS.to_be_bytes());
        reply.extend_from_slice(&4u16.to_be_bytes());
        reply.extend_from_slice(&addr.octets());
    }
    Some(reply)
}

fn question_end(query: &[u8]) -> Option<usize> {
    let mut offset = HEADER_LEN;
    loop {
        let len = *query.get(offset)?;
        offset += 1;
        if len == 0 {
            break;
        }
        // Compression pointers are not valid in a query's first name.
        if len > MAX_LABEL_LEN {
            return None;
        }
        offset += usize::from(len);
    }
    let end = offset + 4;
    (end <= query.len()).then_some(end)
}
