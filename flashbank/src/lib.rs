pub mod animator;
pub mod archive;
pub mod coordinator;
pub mod indicators;
pub mod monitor;
pub mod probe;
pub mod programmer;
pub mod timer;

use argh::FromArgs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, FromArgs, Clone)]
/// Flash bank cloner: CHECK scans all slots, WRITE copies slot 0 to every matching slot
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
}

/// Messages driving the tick loops
pub enum Event {
    Tick,
    Stop,
}

/// Upper bounds on single programming tool runs
#[derive(Clone, Copy, Debug)]
pub struct ToolTimeouts {
    pub identify: Duration,
    pub read: Duration,
    pub write: Duration,
    pub verify: Duration,
}

/// Fixed settings of the bench
#[derive(Clone, Debug)]
pub struct Config {
    /// Programming tool executable
    pub tool: String,
    /// Programmer string without the clock, which comes from the switches
    pub programmer: String,
    /// Passed as `-c` to every tool run when set
    pub chip: Option<String>,
    pub gpio_chip: PathBuf,
    pub spi_dev: PathBuf,
    /// Working copy of the source chip
    pub image: PathBuf,
    /// Content-addressed copies of every source read
    pub archive_dir: PathBuf,
    pub active_low_leds: bool,
    pub tick: Duration,
    pub poll: Duration,
    pub debounce: Duration,
    pub startup_step: Duration,
    pub join_timeout: Duration,
    pub timeouts: ToolTimeouts,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tool: String::from("flashrom"),
            programmer: String::from("linux_spi:dev=/dev/spidev0.0"),
            chip: None,
            gpio_chip: PathBuf::from("/dev/gpiochip0"),
            spi_dev: PathBuf::from("/dev/spidev0.0"),
            image: PathBuf::from("card.bin"),
            archive_dir: PathBuf::from("CardArchive"),
            active_low_leds: false,
            tick: Duration::from_millis(10),
            poll: Duration::from_millis(20),
            debounce: Duration::from_millis(75),
            startup_step: Duration::from_millis(50),
            join_timeout: Duration::from_secs(1),
            timeouts: ToolTimeouts {
                identify: Duration::from_secs(30),
                read: Duration::from_secs(180),
                write: Duration::from_secs(300),
                verify: Duration::from_secs(300),
            },
        }
    }
}
