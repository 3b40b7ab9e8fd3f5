//! Query replies
//!
//! Sent in answer to Read Partition (Query). Each reply is a structured
//! field: 2-byte length, 0x81, reply code, data.

use super::codes::*;
use super::display::ScreenSize;

/// Every reply this terminal supports, concatenated
pub fn query_replies(primary: ScreenSize, alternate: ScreenSize) -> Vec<u8> {
    let mut out = Vec::new();
    summary(&mut out);
    usable_area(&mut out, primary);
    color(&mut out);
    highlighting(&mut out);
    reply_modes(&mut out);
    implicit_partition(&mut out, primary, alternate);
    out
}

fn record(out: &mut Vec<u8>, code: u8, data: &[u8]) {
    let length = (data.len() + 4) as u16;
    out.extend_from_slice(&length.to_be_bytes());
    out.push(SF_QUERY_REPLY);
    out.push(code);
    out.extend_from_slice(data);
}

fn summary(out: &mut Vec<u8>) {
    record(
        out,
        QR_SUMMARY,
        &[
            QR_SUMMARY,
            QR_USABLE_AREA,
            QR_COLOR,
            QR_HIGHLIGHTING,
            QR_REPLY_MODES,
            QR_IMPLICIT_PARTITION,
        ],
    );
}

fn usable_area(out: &mut Vec<u8>, size: ScreenSize) {
    let mut data = vec![
        0x01, // 12/14-bit addressing
        0x00,
    ];
    data.extend_from_slice(&(size.cols() as u16).to_be_bytes());
    data.extend_from_slice(&(size.rows() as u16).to_be_bytes());
    data.push(0x00); // units: inches
    data.extend_from_slice(&[0x00, 0x0A, 0x02, 0xE5]); // Xr
    data.extend_from_slice(&[0x00, 0x02, 0x00, 0x6F]); // Yr
    data.push(0x09); // cell width
    data.push(0x0C); // cell height
    data.extend_from_slice(&(size.buffer_size() as u16).to_be_bytes());
    record(out, QR_USABLE_AREA, &data);
}

fn color(out: &mut Vec<u8>) {
    let mut pairs = vec![COLOR_DEFAULT, COLOR_GREEN];
    for code in COLOR_BLUE..=COLOR_GREY {
        pairs.push(code);
        pairs.push(code);
    }
    let mut data = vec![0x00, (pairs.len() / 2) as u8];
    data.extend(pairs);
    record(out, QR_COLOR, &data);
}

fn highlighting(out: &mut Vec<u8>) {
    record(
        out,
        QR_HIGHLIGHTING,
        &[
            4,
            HIGHLIGHT_DEFAULT,
            HIGHLIGHT_NORMAL,
            HIGHLIGHT_BLINK,
            HIGHLIGHT_BLINK,
            HIGHLIGHT_REVERSE,
            HIGHLIGHT_REVERSE,
            HIGHLIGHT_UNDERSCORE,
            HIGHLIGHT_UNDERSCORE,
        ],
    );
}

fn reply_modes(out: &mut Vec<u8>) {
    record(
        out,
        QR_REPLY_MODES,
        &[REPLY_MODE_FIELD, REPLY_MODE_EXTENDED_FIELD, REPLY_MODE_CHARACTER],
    );
}

fn implicit_partition(out: &mut Vec<u8>, primary: ScreenSize, alternate: ScreenSize) {
    let mut data = vec![0x00, 0x00, 0x0B, 0x01, 0x00];
    for size in [primary, alternate] {
        data.extend_from_slice(&(size.cols() as u16).to_be_bytes());
        data.extend_from_slice(&(size.rows() as u16).to_be_bytes());
    }
    record(out, QR_IMPLICIT_PARTITION, &data);
}
