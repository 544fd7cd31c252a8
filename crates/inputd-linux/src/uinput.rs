//! uinput injection backend, one constructor per supported setup ABI.
//!
//! `/dev/uinput` is the privileged facility here: opening it requires the
//! right capabilities, and the device-setup interface drifted across kernel
//! revisions. Protocol v5 added the `UI_DEV_SETUP`/`UI_ABS_SETUP` ioctls;
//! before that the only way in was writing a `uinput_user_dev` blob to the
//! fd. Both shapes deliver events the same way afterwards: raw
//! `input_event` records written to the fd, fire-and-forget.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use inputd_platform::capability::{CallShape, EventSink};
use inputd_platform::event::{
    KeyDirection, KeyEvent, PointerEvent, ACTION_DOWN, ACTION_MOVE, ACTION_UP,
};

const UINPUT_PATH: &str = "/dev/uinput";
const DEVICE_NAME: &[u8] = b"inputd virtual touchscreen";

// Event types and codes from <linux/input-event-codes.h>.
const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_ABS: u16 = 0x03;
const SYN_REPORT: u16 = 0x00;
const ABS_X: u16 = 0x00;
const ABS_Y: u16 = 0x01;
const BTN_TOUCH: u16 = 0x14a;
const BUS_VIRTUAL: u16 = 0x06;

/// Highest key code registered on the virtual device; wire key codes above
/// this are refused before reaching the kernel.
const KEY_CODE_MAX: u16 = 0x2ff;

const ABS_AXIS_MAX: i32 = 32767;
const ABS_CNT: usize = 0x40;

// uinput ioctls ('U' magic, <linux/uinput.h>).
nix::ioctl_none!(ui_dev_create, b'U', 1);
nix::ioctl_none!(ui_dev_destroy, b'U', 2);
nix::ioctl_write_ptr!(ui_dev_setup, b'U', 3, UinputSetup);
nix::ioctl_write_ptr!(ui_abs_setup, b'U', 4, UinputAbsSetup);
nix::ioctl_read!(ui_get_version, b'U', 45, libc::c_uint);
nix::ioctl_write_int!(ui_set_evbit, b'U', 100);
nix::ioctl_write_int!(ui_set_keybit, b'U', 101);
nix::ioctl_write_int!(ui_set_absbit, b'U', 103);

#[repr(C)]
#[derive(Clone, Copy)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

#[repr(C)]
struct UinputSetup {
    id: InputId,
    name: [u8; 80],
    ff_effects_max: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct InputAbsInfo {
    value: i32,
    minimum: i32,
    maximum: i32,
    fuzz: i32,
    flat: i32,
    resolution: i32,
}

#[repr(C)]
struct UinputAbsSetup {
    code: u16,
    absinfo: InputAbsInfo,
}

#[repr(C)]
struct UinputUserDev {
    name: [u8; 80],
    id: InputId,
    ff_effects_max: u32,
    absmax: [i32; ABS_CNT],
    absmin: [i32; ABS_CNT],
    absfuzz: [i32; ABS_CNT],
    absflat: [i32; ABS_CNT],
}

/// struct input_event, with the anonymous time fields spelled out.
#[repr(C)]
struct RawEvent {
    time: libc::timeval,
    kind: u16,
    code: u16,
    value: i32,
}

fn virtual_id() -> InputId {
    InputId {
        bustype: BUS_VIRTUAL,
        vendor: 0,
        product: 0,
        version: 1,
    }
}

fn name_buf() -> [u8; 80] {
    let mut name = [0u8; 80];
    name[..DEVICE_NAME.len()].copy_from_slice(DEVICE_NAME);
    name
}

fn open_uinput() -> Result<File> {
    OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(UINPUT_PATH)
        .with_context(|| format!("failed to open {}", UINPUT_PATH))
}

/// Register the event/key/axis bits the virtual device will emit.
fn configure_bits(fd: libc::c_int) -> Result<()> {
    unsafe {
        ui_set_evbit(fd, EV_SYN as libc::c_ulong).context("UI_SET_EVBIT EV_SYN")?;
        ui_set_evbit(fd, EV_KEY as libc::c_ulong).context("UI_SET_EVBIT EV_KEY")?;
        ui_set_evbit(fd, EV_ABS as libc::c_ulong).context("UI_SET_EVBIT EV_ABS")?;
        ui_set_keybit(fd, BTN_TOUCH as libc::c_ulong).context("UI_SET_KEYBIT BTN_TOUCH")?;
        // Wire key codes are passed through verbatim, so register the full range.
        for code in 0..=KEY_CODE_MAX {
            ui_set_keybit(fd, code as libc::c_ulong).context("UI_SET_KEYBIT")?;
        }
        ui_set_absbit(fd, ABS_X as libc::c_ulong).context("UI_SET_ABSBIT ABS_X")?;
        ui_set_absbit(fd, ABS_Y as libc::c_ulong).context("UI_SET_ABSBIT ABS_Y")?;
    }
    Ok(())
}

/// Bind via the v5+ ioctl setup interface, the newer call shape.
pub fn probe_dev_setup() -> Result<Arc<dyn EventSink>> {
    let file = open_uinput()?;
    let fd = file.as_raw_fd();

    let mut version: libc::c_uint = 0;
    unsafe { ui_get_version(fd, &mut version) }.context("UI_GET_VERSION unsupported")?;
    if version < 5 {
        bail!("uinput protocol v{} predates UI_DEV_SETUP", version);
    }

    configure_bits(fd)?;

    let setup = UinputSetup {
        id: virtual_id(),
        name: name_buf(),
        ff_effects_max: 0,
    };
    unsafe { ui_dev_setup(fd, &setup) }.context("UI_DEV_SETUP failed")?;

    for code in [ABS_X, ABS_Y] {
        let abs = UinputAbsSetup {
            code,
            absinfo: InputAbsInfo {
                maximum: ABS_AXIS_MAX,
                ..Default::default()
            },
        };
        unsafe { ui_abs_setup(fd, &abs) }.context("UI_ABS_SETUP failed")?;
    }

    unsafe { ui_dev_create(fd) }.context("UI_DEV_CREATE failed")?;
    debug!("uinput device created (dev-setup shape, protocol v{})", version);

    Ok(Arc::new(UinputBackend {
        file,
        shape: CallShape::DevSetup,
    }))
}

/// Bind via the pre-v5 write-based setup interface, the fallback shape.
pub fn probe_legacy_write() -> Result<Arc<dyn EventSink>> {
    let mut file = open_uinput()?;
    let fd = file.as_raw_fd();

    configure_bits(fd)?;

    let mut dev = UinputUserDev {
        name: name_buf(),
        id: virtual_id(),
        ff_effects_max: 0,
        absmax: [0; ABS_CNT],
        absmin: [0; ABS_CNT],
        absfuzz: [0; ABS_CNT],
        absflat: [0; ABS_CNT],
    };
    dev.absmax[ABS_X as usize] = ABS_AXIS_MAX;
    dev.absmax[ABS_Y as usize] = ABS_AXIS_MAX;

    // SAFETY: UinputUserDev is repr(C) plain data with no padding invariants.
    let bytes = unsafe {
        std::slice::from_raw_parts(
            &dev as *const UinputUserDev as *const u8,
            std::mem::size_of::<UinputUserDev>(),
        )
    };
    file.write_all(bytes).context("writing uinput_user_dev")?;

    unsafe { ui_dev_create(fd) }.context("UI_DEV_CREATE failed")?;
    debug!("uinput device created (legacy-write shape)");

    Ok(Arc::new(UinputBackend {
        file,
        shape: CallShape::LegacyWrite,
    }))
}

/// A created uinput device. Event delivery is a plain write of
/// `input_event` records; the kernel never acknowledges consumption.
pub struct UinputBackend {
    file: File,
    shape: CallShape,
}

impl UinputBackend {
    /// Emit one batch of records as a single write so that records from
    /// concurrent workers cannot interleave inside an event group.
    fn emit(&self, records: &[RawEvent]) -> Result<bool> {
        let mut buf = Vec::with_capacity(records.len() * std::mem::size_of::<RawEvent>());
        for rec in records {
            // SAFETY: RawEvent is repr(C) plain data.
            let bytes = unsafe {
                std::slice::from_raw_parts(
                    rec as *const RawEvent as *const u8,
                    std::mem::size_of::<RawEvent>(),
                )
            };
            buf.extend_from_slice(bytes);
        }
        (&self.file).write_all(&buf).context("writing input events")?;
        Ok(true)
    }
}

fn raw(time_ms: u64, kind: u16, code: u16, value: i32) -> RawEvent {
    RawEvent {
        time: libc::timeval {
            tv_sec: (time_ms / 1000) as libc::time_t,
            tv_usec: ((time_ms % 1000) * 1000) as libc::suseconds_t,
        },
        kind,
        code,
        value,
    }
}

impl EventSink for UinputBackend {
    fn shape(&self) -> CallShape {
        self.shape
    }

    fn inject_pointer(&self, event: &PointerEvent) -> Result<bool> {
        if event.display_id != 0 {
            // uinput has no per-display targeting; the compositor routes the
            // virtual touchscreen, so fall through to the default display.
            warn!(
                "cannot target display {}, injecting on default display",
                event.display_id
            );
        }

        let t = event.event_time_ms;
        let mut records = Vec::with_capacity(4);
        match event.action {
            ACTION_DOWN => {
                records.push(raw(t, EV_ABS, ABS_X, event.x));
                records.push(raw(t, EV_ABS, ABS_Y, event.y));
                records.push(raw(t, EV_KEY, BTN_TOUCH, 1));
            }
            ACTION_MOVE => {
                records.push(raw(t, EV_ABS, ABS_X, event.x));
                records.push(raw(t, EV_ABS, ABS_Y, event.y));
            }
            ACTION_UP => {
                records.push(raw(t, EV_KEY, BTN_TOUCH, 0));
            }
            other => {
                debug!("unsupported pointer action {}", other);
                return Ok(false);
            }
        }
        records.push(raw(t, EV_SYN, SYN_REPORT, 0));
        self.emit(&records)
    }

    fn inject_key(&self, event: &KeyEvent) -> Result<bool> {
        if !(0..=KEY_CODE_MAX as i32).contains(&event.key_code) {
            debug!("key code {} outside registered range", event.key_code);
            return Ok(false);
        }
        let value = match event.direction {
            KeyDirection::Down => 1,
            KeyDirection::Up => 0,
        };
        self.emit(&[
            raw(event.event_time_ms, EV_KEY, event.key_code as u16, value),
            raw(event.event_time_ms, EV_SYN, SYN_REPORT, 0),
        ])
    }
}

impl Drop for UinputBackend {
    fn drop(&mut self) {
        if let Err(e) = unsafe { ui_dev_destroy(self.file.as_raw_fd()) } {
            debug!("UI_DEV_DESTROY failed: {}", e);
        }
    }
}
