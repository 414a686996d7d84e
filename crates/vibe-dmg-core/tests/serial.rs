mod common;

use vibe_dmg_core::{
    diagnostics::{DiagnosticEvent, SharedRingBuffer},
    headless::{SerialVerdict, run_serial_test},
    interrupts::Interrupt,
    serial::NullLinkPort,
};

#[test]
fn printed_text_reaches_the_output_buffer() {
    let mut gb = common::machine(&common::serial_print_program("hello"));
    gb.step_frame().unwrap();
    assert_eq!(gb.serial_output(), b"hello");
    assert_eq!(gb.take_serial_output(), b"hello".to_vec());
    assert!(gb.serial_output().is_empty());
}

#[test]
fn passing_rom_is_detected() {
    let mut gb = common::machine(&common::serial_print_program("cpu_instrs\n\nPassed\n"));
    let report = run_serial_test(&mut gb, 10).unwrap();
    assert_eq!(report.verdict, SerialVerdict::Passed);
    assert_eq!(report.text, "cpu_instrs\n\nPassed\n");
    assert_eq!(report.frames, 1);
}

#[test]
fn failing_rom_is_detected() {
    let mut gb = common::machine(&common::serial_print_program("01:ok 02:Failed\n"));
    let report = run_serial_test(&mut gb, 10).unwrap();
    assert_eq!(report.verdict, SerialVerdict::Failed);
    assert!(report.text.contains("02:Failed"));
}

#[test]
fn silent_rom_times_out() {
    // JR -2
    let mut gb = common::machine(&[0x18, 0xFE]);
    let report = run_serial_test(&mut gb, 3).unwrap();
    assert_eq!(report.verdict, SerialVerdict::Timeout);
    assert_eq!(report.frames, 3);
    assert!(report.text.is_empty());
}

#[test]
fn locked_cpu_aborts_the_run() {
    let mut gb = common::machine(&[0xD3]);
    assert!(run_serial_test(&mut gb, 10).is_err());
}

#[test]
fn transfer_completes_immediately_with_interrupt() {
    let program = [
        0x3E, 0x42, // LD A,0x42
        0xE0, 0x01, // LDH (SB),A
        0x3E, 0x81, // LD A,0x81
        0xE0, 0x02, // LDH (SC),A
    ];
    let mut gb = common::machine(&program);
    gb.bus.ints.flag = 0;
    for _ in 0..4 {
        gb.step().unwrap();
    }
    assert_eq!(gb.serial_output(), [0x42]);
    assert_ne!(gb.bus.ints.flag & Interrupt::Serial.mask(), 0);
    // transfer bit cleared
    assert_eq!(gb.bus.read(0xFF02), 0x7F);
    // nothing connected
    assert_eq!(gb.bus.read(0xFF01), 0x00);
}

#[test]
fn link_port_supplies_the_received_byte() {
    let mut gb = common::machine(&common::serial_print_program("A"));
    gb.bus.serial.connect(Box::new(NullLinkPort::new(true)));
    gb.step_frame().unwrap();
    assert_eq!(gb.bus.read(0xFF01), b'A');

    let mut gb = common::machine(&common::serial_print_program("A"));
    gb.bus.serial.connect(Box::new(NullLinkPort::new(false)));
    gb.step_frame().unwrap();
    assert_eq!(gb.bus.read(0xFF01), 0xFF);
}

#[test]
fn disconnected_port_receives_zero() {
    let mut gb = common::machine(&[]);
    gb.bus.serial.connect(Box::new(NullLinkPort::new(true)));
    gb.bus.write(0xFF01, b'Z');
    gb.bus.write(0xFF02, 0x81);
    assert_eq!(gb.bus.read(0xFF01), b'Z');

    gb.bus.serial.disconnect();
    gb.bus.write(0xFF01, b'Z');
    gb.bus.write(0xFF02, 0x81);
    assert_eq!(gb.bus.read(0xFF01), 0x00);
    assert_eq!(gb.serial_output(), b"ZZ");
}

#[test]
fn external_clock_does_not_transfer() {
    // LD A,0x55 ; LDH (SB),A ; LD A,0x80 ; LDH (SC),A
    let mut gb = common::machine(&[0x3E, 0x55, 0xE0, 0x01, 0x3E, 0x80, 0xE0, 0x02]);
    for _ in 0..4 {
        gb.step().unwrap();
    }
    assert!(gb.serial_output().is_empty());
    assert_eq!(gb.bus.read(0xFF01), 0x55);
    assert_eq!(gb.bus.read(0xFF02), 0xFE);
}

#[test]
fn serial_bytes_are_reported_to_the_sink() {
    let mut gb = common::machine(&common::serial_print_program("ok"));
    let events = SharedRingBuffer::new(8);
    gb.set_diagnostics_sink(Box::new(events.clone()));
    gb.step_frame().unwrap();

    let bytes: Vec<u8> = events
        .snapshot()
        .into_iter()
        .filter_map(|e| match e {
            DiagnosticEvent::SerialByte(b) => Some(b),
            _ => None,
        })
        .collect();
    assert_eq!(bytes, b"ok");
}

#[test]
fn cleared_sink_stops_recording() {
    let mut gb = common::machine(&[]);
    let events = SharedRingBuffer::new(8);
    gb.set_diagnostics_sink(Box::new(events.clone()));
    gb.bus.write(0xFF01, b'x');
    gb.bus.write(0xFF02, 0x81);
    assert_eq!(events.snapshot(), vec![DiagnosticEvent::SerialByte(b'x')]);

    gb.clear_diagnostics_sink();
    gb.bus.write(0xFF02, 0x81);
    assert_eq!(events.snapshot().len(), 1);
    assert_eq!(gb.serial_output().len(), 2);
}
