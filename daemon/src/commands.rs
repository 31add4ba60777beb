//! Line Commands - parsed from stdin, executed against the effects service

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, bail, Result};

use tonal_core::{EffectsService, RecordingProbe};
use tonal_platform::stub::StubRoutingSource;
use tonal_platform::{DeviceKind, DeviceMask, OutputDevice, SessionId};

pub const HELP: &str = "\
commands:
  open <session>              attach effects to a playback session
  close <session>             detach effects (after the backend grace period)
  set <key> <value>           write a setting for the active device
  preset <name>               load a preset into the active device's equalizer
  preview <band> <db>         live-preview one equalizer band
  device <kind> [address]     route music to an output (speaker, headset, bluetooth, usb, wireless)
  unplug <kind> [address]     disconnect an output
  record on|off               simulate an active recording
  curve [points]              print the equalizer response of the active device
  status                      show the active device, its settings and sessions
  help
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(SessionId),
    Close(SessionId),
    Set { key: String, value: String },
    Preset(String),
    Preview { band: usize, level_db: f32 },
    Device(OutputDevice),
    Unplug(OutputDevice),
    Record(bool),
    Curve(usize),
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb, args.as_slice()) {
            ("open", [id]) => Command::Open(parse_session(id)?),
            ("close", [id]) => Command::Close(parse_session(id)?),
            ("set", [key, value @ ..]) if !value.is_empty() => Command::Set {
                key: key.to_string(),
                value: value.join(" "),
            },
            ("preset", name) if !name.is_empty() => Command::Preset(name.join(" ")),
            ("preview", [band, level]) => Command::Preview {
                band: band.parse()?,
                level_db: level.parse()?,
            },
            ("device", [kind, rest @ ..]) if rest.len() <= 1 => {
                Command::Device(parse_device(kind, rest.first())?)
            }
            ("unplug", [kind, rest @ ..]) if rest.len() <= 1 => {
                Command::Unplug(parse_device(kind, rest.first())?)
            }
            ("record", ["on"]) => Command::Record(true),
            ("record", ["off"]) => Command::Record(false),
            ("curve", []) => Command::Curve(32),
            ("curve", [points]) => Command::Curve(points.parse()?),
            ("status", []) => Command::Status,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => bail!("unrecognised command: {} (try `help`)", line.trim()),
        };
        Ok(Some(command))
    }
}

fn parse_session(raw: &str) -> Result<SessionId> {
    raw.parse()
        .map_err(|e| anyhow!("bad session id {:?}: {}", raw, e))
}

fn parse_device(kind: &str, address: Option<&&str>) -> Result<OutputDevice> {
    let kind = DeviceKind::from_key(kind).ok_or_else(|| anyhow!("unknown device kind {:?}", kind))?;
    let name = match kind {
        DeviceKind::Speaker => "Speaker",
        DeviceKind::Headset => "Wired headset",
        DeviceKind::Bluetooth => "Bluetooth audio",
        DeviceKind::Usb => "USB audio",
        DeviceKind::Wireless => "Wireless display",
    };
    Ok(OutputDevice::new(kind, name, address.map(|a| a.to_string())))
}

/// Recording flag flipped by the `record` command
#[derive(Default)]
pub struct ManualRecording(AtomicBool);

impl ManualRecording {
    pub fn set(&self, recording: bool) {
        self.0.store(recording, Ordering::SeqCst);
    }
}

impl RecordingProbe for ManualRecording {
    fn is_recording(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Whether the daemon should keep reading input
pub enum Flow {
    Continue,
    Stop,
}

pub struct Session<'a> {
    pub service: &'a EffectsService,
    pub routing: &'a StubRoutingSource,
    pub recording: &'a ManualRecording,
}

impl Session<'_> {
    pub fn execute(&self, command: Command) -> Result<Flow> {
        match command {
            Command::Open(id) => self.service.open_session(id)?,
            Command::Close(id) => self.service.close_session(id),
            Command::Set { key, value } => self.service.write_value(&key, &value)?,
            Command::Preset(name) => self.service.select_preset(&name)?,
            Command::Preview { band, level_db } => self.service.preview_band(band, level_db)?,
            Command::Device(device) => {
                if device.kind == DeviceKind::Speaker {
                    self.routing
                        .set_route(DeviceMask::from_kinds(&[DeviceKind::Speaker]));
                } else {
                    self.routing.connect(device);
                }
            }
            Command::Unplug(device) => self.routing.disconnect(&device),
            Command::Record(on) => self.recording.set(on),
            Command::Curve(points) => self.print_curve(points)?,
            Command::Status => self.print_status()?,
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Flow::Stop),
        }
        Ok(Flow::Continue)
    }

    fn print_curve(&self, points: usize) -> Result<()> {
        for point in self.service.response_curve(points)? {
            println!("{:>9.1} Hz  {:>+6.2} dB", point.frequency_hz, point.gain_db);
        }
        Ok(())
    }

    fn print_status(&self) -> Result<()> {
        self.service.coordinator().flush()?;
        let device = self.service.active_device();
        println!("device:   {}", device);
        println!(
            "sessions: {}",
            self.service.coordinator().session_count()
        );
        println!(
            "{}",
            serde_json::to_string_pretty(&self.service.configuration())?
        );
        Ok(())
    }
}
