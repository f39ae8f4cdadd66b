//! Windows overlay: a ring-sized layered popup that follows the pointer.
//!
//! The ring bitmap lives in a DIB section created once per surface and is
//! pushed with `UpdateLayeredWindow`, which moves and repaints the window
//! in a single call. Per-pixel alpha means no WM_PAINT handling, so only a
//! non-blocking message drain is needed on the engine thread.

use crate::{PlatformError, PlatformResult};
use pipette_core::{ring_alpha_mask, IndicatorStyle, Monitor, OverlaySurface, Point, Rgb};
use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::sync::Once;
use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{HWND, LPARAM, LRESULT, POINT, SIZE, WPARAM};
use windows_sys::Win32::Graphics::Gdi::{
    CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, ReleaseDC, SelectObject,
    AC_SRC_ALPHA, AC_SRC_OVER, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, BLENDFUNCTION,
    DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, PeekMessageW,
    RegisterClassW, ShowWindow, TranslateMessage, UpdateLayeredWindow, MSG, PM_REMOVE,
    SW_SHOWNOACTIVATE, ULW_ALPHA, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
    WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

static REGISTER_CLASS: Once = Once::new();

fn class_name() -> Vec<u16> {
    "PipetteRing\0".encode_utf16().collect()
}

fn ensure_class_registered() {
    REGISTER_CLASS.call_once(|| unsafe {
        let name = class_name();
        let mut wc: WNDCLASSW = mem::zeroed();
        wc.lpfnWndProc = Some(ring_wnd_proc);
        wc.hInstance = GetModuleHandleW(ptr::null());
        wc.lpszClassName = name.as_ptr();
        if RegisterClassW(&wc) == 0 {
            warn!("RegisterClassW failed for overlay class");
        }
        // The class keeps a pointer to the name for the process lifetime.
        mem::forget(name);
    });
}

unsafe extern "system" fn ring_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

/// Physical screen position of a surface-local point (bottom-left origin,
/// logical units) on `monitor`, whose top-left corner sits at the physical
/// `origin`.
pub fn to_physical(monitor: &Monitor, origin: (i32, i32), local: Point) -> (f64, f64) {
    let scale = monitor.scale_factor.max(1.0);
    (
        f64::from(origin.0) + local.x * scale,
        f64::from(origin.1) + (monitor.frame.height - local.y) * scale,
    )
}

/// Premultiplied BGRA ring pixels for `stroke`.
fn ring_pixels(mask: &[u8], stroke: Rgb) -> impl Iterator<Item = u32> + '_ {
    let opaque =
        0xFF00_0000 | (u32::from(stroke.r) << 16) | (u32::from(stroke.g) << 8) | u32::from(stroke.b);
    mask.iter().map(move |&a| if a == 0 { 0 } else { opaque })
}

pub struct RingWindow {
    hwnd: HWND,
    mem_dc: HDC,
    bitmap: HBITMAP,
    old_object: HGDIOBJ,
    bits: *mut u32,
    side: i32,
    mask: Vec<u8>,
    last_stroke: Option<Rgb>,
    monitor: Monitor,
    origin: (i32, i32),
}

impl RingWindow {
    pub fn create(
        monitor: &Monitor,
        style: IndicatorStyle,
        origin: (i32, i32),
    ) -> PlatformResult<Self> {
        ensure_class_registered();

        let scale = monitor.scale_factor.max(1.0);
        let (side, mask) = ring_alpha_mask(style.diameter * scale, style.stroke_width * scale);
        let side = side as i32;

        unsafe {
            let name = class_name();
            let hwnd = CreateWindowExW(
                WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
                name.as_ptr(),
                ptr::null(),
                WS_POPUP,
                0,
                0,
                side,
                side,
                ptr::null_mut(),
                ptr::null_mut(),
                GetModuleHandleW(ptr::null()),
                ptr::null(),
            );
            if hwnd.is_null() {
                return Err(PlatformError::Window("CreateWindowExW failed".into()));
            }

            let screen_dc = GetDC(ptr::null_mut());
            let mem_dc = CreateCompatibleDC(screen_dc);
            ReleaseDC(ptr::null_mut(), screen_dc);

            let mut bmi: BITMAPINFO = mem::zeroed();
            bmi.bmiHeader.biSize = mem::size_of::<BITMAPINFOHEADER>() as u32;
            bmi.bmiHeader.biWidth = side;
            bmi.bmiHeader.biHeight = -side; // top-down
            bmi.bmiHeader.biPlanes = 1;
            bmi.bmiHeader.biBitCount = 32;
            bmi.bmiHeader.biCompression = BI_RGB;

            let mut bits: *mut c_void = ptr::null_mut();
            let bitmap = CreateDIBSection(mem_dc, &bmi, DIB_RGB_COLORS, &mut bits, ptr::null_mut(), 0);
            if bitmap.is_null() || bits.is_null() {
                if !bitmap.is_null() {
                    DeleteObject(bitmap);
                }
                DeleteDC(mem_dc);
                DestroyWindow(hwnd);
                return Err(PlatformError::Window("CreateDIBSection failed".into()));
            }
            let old_object = SelectObject(mem_dc, bitmap);

            debug!(monitor = monitor.id, side, "overlay window created");
            Ok(Self {
                hwnd,
                mem_dc,
                bitmap,
                old_object,
                bits: bits as *mut u32,
                side,
                mask,
                last_stroke: None,
                monitor: monitor.clone(),
                origin,
            })
        }
    }

    fn paint(&mut self, stroke: Rgb) {
        // SAFETY: `bits` points to `side * side` pixels owned by `bitmap`,
        // which lives until `close`.
        let buf =
            unsafe { std::slice::from_raw_parts_mut(self.bits, (self.side * self.side) as usize) };
        for (dst, px) in buf.iter_mut().zip(ring_pixels(&self.mask, stroke)) {
            *dst = px;
        }
        self.last_stroke = Some(stroke);
    }

    fn pump_messages(&self) {
        unsafe {
            let mut msg: MSG = mem::zeroed();
            while PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE) != 0 {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

impl OverlaySurface for RingWindow {
    fn present(&mut self, center: Point, stroke: Rgb) {
        if self.hwnd.is_null() {
            return;
        }
        if self.last_stroke != Some(stroke) {
            self.paint(stroke);
        }

        let (px, py) = to_physical(&self.monitor, self.origin, center);
        let half = f64::from(self.side) / 2.0;
        let dst = POINT {
            x: (px - half).round() as i32,
            y: (py - half).round() as i32,
        };
        let size = SIZE {
            cx: self.side,
            cy: self.side,
        };
        let src = POINT { x: 0, y: 0 };
        let blend = BLENDFUNCTION {
            BlendOp: AC_SRC_OVER as u8,
            BlendFlags: 0,
            SourceConstantAlpha: 255,
            AlphaFormat: AC_SRC_ALPHA as u8,
        };

        unsafe {
            let screen_dc = GetDC(ptr::null_mut());
            let ok = UpdateLayeredWindow(
                self.hwnd,
                screen_dc,
                &dst,
                &size,
                self.mem_dc,
                &src,
                0,
                &blend,
                ULW_ALPHA,
            );
            ReleaseDC(ptr::null_mut(), screen_dc);
            if ok == 0 {
                warn!(monitor = self.monitor.id, "UpdateLayeredWindow failed");
            }
            ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
        }
        self.pump_messages();
    }

    fn close(&mut self) {
        if self.hwnd.is_null() {
            return;
        }
        unsafe {
            SelectObject(self.mem_dc, self.old_object);
            DeleteObject(self.bitmap);
            DeleteDC(self.mem_dc);
            DestroyWindow(self.hwnd);
        }
        self.hwnd = ptr::null_mut();
        self.bits = ptr::null_mut();
        debug!(monitor = self.monitor.id, "overlay window destroyed");
    }
}
