//! Session integration tests
//!
//! A scripted host conversation: a logon panel, an IND$FILE download and
//! the host's completion message.

use tn3270r::ebcdic::ascii_to_ebcdic_vec;
use tn3270r::lib3270::{addressing, AidKey, ScreenBuffer, AID_STRUCTURED_FIELD};
use tn3270r::transfer::record;
use tn3270r::transfer::{ChannelFileStore, Direction, IndFileCommand};
use tn3270r::{ClientConfig, ScreenObserver, Session};

struct KeyboardLog(std::sync::mpsc::Sender<bool>);

impl ScreenObserver for KeyboardLog {
    fn on_screen_changed(&mut self, _screen: &ScreenBuffer) {}

    fn on_keyboard_status_changed(&mut self, locked: bool) {
        let _ = self.0.send(locked);
    }
}

fn wsf(record: &[u8]) -> Vec<u8> {
    let mut message = vec![0xF3, 0x00, 0x00];
    message.extend_from_slice(record);
    message
}

/// Logon panel with a protected label and an input field
fn panel() -> Vec<u8> {
    let mut message = vec![0xF5, 0x42, 0x1D, 0x60];
    message.extend(ascii_to_ebcdic_vec("USERID"));
    message.extend([0x1D, 0x40, 0x13]);
    message.push(0x11);
    message.extend_from_slice(&addressing::encode(30, 1920));
    message.extend([0x1D, 0x60]);
    message
}

/// Logon, download, completion message
#[test]
fn test_download_conversation() {
    let (store, mut files) = ChannelFileStore::channel();
    let config = ClientConfig { tlq: Some("IBMUSER".to_string()), ..ClientConfig::default() };
    let mut session = Session::new(&config, Box::new(store));
    let (sender, keyboard) = std::sync::mpsc::channel();
    session.subscribe(Box::new(KeyboardLog(sender)));

    assert!(session.process_message(&panel()).unwrap().is_empty());
    assert_eq!(session.screen().cursor(), 8);
    session.type_text("IBMUSER").unwrap();
    let logon = session.send_aid(AidKey::Enter);
    let mut expected = vec![0x7D];
    expected.extend_from_slice(&addressing::encode(15, 1920));
    expected.push(0x11);
    expected.extend_from_slice(&addressing::encode(8, 1920));
    expected.extend(ascii_to_ebcdic_vec("IBMUSER"));
    assert_eq!(logon, expected);

    // TSO READY: unformatted screen
    session.process_message(&[0xF5, 0xC2]).unwrap();
    session
        .submit_transfer(IndFileCommand::text(Direction::Get, "listing.txt"))
        .unwrap();

    let replies: Vec<Vec<u8>> = [
        record::open_record(false),
        record::data_record(b"LINE ONE\r\nLINE TWO\r\n"),
        record::close_record(),
        record::open_record(true),
        record::data_record(b"TRANS03 File transfer complete"),
        record::close_record(),
    ]
    .iter()
    .flat_map(|r| session.process_message(&wsf(r)).unwrap())
    .collect();

    assert_eq!(replies.len(), 6);
    assert!(replies.iter().all(|reply| reply[0] == AID_STRUCTURED_FIELD));
    assert_eq!(&replies[1][1..], record::data_ack(1).as_slice());

    let file = files.try_recv().unwrap();
    assert_eq!(file.name, "IBMUSER.LISTING");
    assert_eq!(file.data, b"LINE ONE\nLINE TWO\n");
    assert!(files.try_recv().is_err());
    assert_eq!(session.host_message(), Some("TRANS03 File transfer complete"));

    let changes: Vec<bool> = keyboard.try_iter().collect();
    assert_eq!(changes, vec![false, true, false, true]);
}

/// A malformed transfer record is answered without ending the session
#[test]
fn test_malformed_record_gets_error_reply() {
    let (store, _files) = ChannelFileStore::channel();
    let mut session = Session::new(&ClientConfig::default(), Box::new(store));
    let replies = session.process_message(&wsf(&[0xD0, 0x47, 0x04, 0x00])).unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(&replies[0][1..], record::error_ack(0x47, record::ERR_COMMAND_FAILED).as_slice());
    assert!(session.take_transfer_error().is_some());
    assert!(session.process_message(&[0xF5, 0x02]).is_ok());
}
