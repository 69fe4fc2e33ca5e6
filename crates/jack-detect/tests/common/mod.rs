//! Shared fixtures: a board built entirely from `platform::mocks`.

#![allow(dead_code)]

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use jack_detect::{Board, Codec, CodecKind, JackConfig, JackDetect, Peripherals, Work};
use platform::mocks::{
    MockBias, MockPin, MockRegmap, MockRegulator, MockWorkQueue, RecordingSink,
};

pub struct MockBoard;

impl Board for MockBoard {
    type Regmap = MockRegmap;
    type Pin = MockPin;
    type Micvdd = MockRegulator;
    type Bias = MockBias;
    type Work = MockWorkQueue<Work>;
    type Sink = RecordingSink;
}

pub type TestJack = JackDetect<NoopRawMutex, MockBoard>;

/// WM5110 rev A: direct-ohms HPDET, tunable outputs, no mic clamp.
pub const WM5110_REV_A: Codec = Codec {
    kind: CodecKind::Wm5110,
    revision: 0,
};

pub fn peripherals() -> Peripherals<MockBoard> {
    Peripherals {
        regmap: MockRegmap::new(),
        micvdd: MockRegulator::new(),
        micbias: MockBias::new(),
        polarity_gpio: Some(MockPin::new()),
        id_gpio: Some(MockPin::new()),
        work: MockWorkQueue::new(),
        sink: RecordingSink::new(),
    }
}

/// Route `tracing` output to the test harness; `RUST_LOG=debug` shows every
/// measurement. No-op unless built with the `tracing` feature.
pub fn init_logging() {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

pub fn jack_with(config: JackConfig, codec: Codec) -> TestJack {
    init_logging();
    JackDetect::new(peripherals(), config, codec).unwrap()
}

pub fn jack() -> TestJack {
    jack_with(JackConfig::default(), WM5110_REV_A)
}

/// Fire `work` if the queue holds it, like a timer expiring.
pub fn fire(jack: &TestJack, work: Work) {
    let due = jack.with_peripherals(|hw| hw.work.take(work)).unwrap();
    assert!(due, "{} was not scheduled", work.name());
    jack.run_work(work).unwrap();
}

pub fn set_reg(jack: &TestJack, reg: u32, val: u32) {
    jack.with_peripherals(|hw| hw.regmap.set(reg, val)).unwrap();
}
