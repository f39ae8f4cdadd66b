//! JSON-lines command bridge between a host process and the engine.
//!
//! Each input line is a request `{"id", "method", "args"}`; each answer is
//! one line `{"id", "ok"}` or `{"id", "error": {"code", "message"}}`.
//! Engine events are written to the same stream by [`write_events`].

use base64::Engine as _;
use crossbeam_channel::Receiver;
use pipette_core::{
    ChannelSink, ColorSample, Completion, EngineHandle, EventSink, HotkeyChord, PickerConfig,
    PickerError, PickerEvent, PickerResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Engine operations the bridge exposes.
pub trait Picker {
    fn start(&self, on_result: Option<Completion>) -> PickerResult<()>;
    fn stop(&self);
    fn save_current_color(&self);
    fn pick_color(&self) -> PickerResult<ColorSample>;
    fn magnify(&self, x: f64, y: f64) -> PickerResult<Vec<u8>>;
    fn update_hotkey(&self, chord: &str) -> PickerResult<HotkeyChord>;
    fn shutdown(&self);
}

impl Picker for EngineHandle {
    fn start(&self, on_result: Option<Completion>) -> PickerResult<()> {
        EngineHandle::start(self, on_result)
    }
    fn stop(&self) {
        EngineHandle::stop(self)
    }
    fn save_current_color(&self) {
        EngineHandle::save_current_color(self)
    }
    fn pick_color(&self) -> PickerResult<ColorSample> {
        EngineHandle::pick_color(self)
    }
    fn magnify(&self, x: f64, y: f64) -> PickerResult<Vec<u8>> {
        EngineHandle::magnify(self, x, y)
    }
    fn update_hotkey(&self, chord: &str) -> PickerResult<HotkeyChord> {
        EngineHandle::update_hotkey(self, chord)
    }
    fn shutdown(&self) {
        EngineHandle::shutdown(self)
    }
}

#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn not_implemented(method: &str) -> Self {
        Self {
            code: "NOT_IMPLEMENTED".into(),
            message: format!("unknown method: {method}"),
        }
    }
}

impl From<PickerError> for ApiError {
    fn from(err: PickerError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Response {
    fn ok(id: u64, value: Value) -> Self {
        Self {
            id: Some(id),
            ok: Some(value),
            error: None,
        }
    }

    fn error(id: Option<u64>, error: ApiError) -> Self {
        Self {
            id,
            ok: None,
            error: Some(error),
        }
    }
}

#[derive(Deserialize)]
struct MagnifyArgs {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct HotkeyArgs {
    chord: String,
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, ApiError> {
    serde_json::from_value(args)
        .map_err(|e| PickerError::InvalidArguments(e.to_string()).into())
}

/// Whether the bridge keeps serving after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Bridge<P: Picker> {
    picker: P,
    sink: ChannelSink,
    config: PickerConfig,
    /// Where `updateHotkey` persists the new chord; `None` keeps it in memory.
    config_path: Option<PathBuf>,
}

impl<P: Picker> Bridge<P> {
    pub fn new(
        picker: P,
        sink: ChannelSink,
        config: PickerConfig,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            picker,
            sink,
            config,
            config_path,
        }
    }

    /// Handle one input line.
    pub fn handle_line(&mut self, line: &str) -> (Response, Flow) {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.dispatch(request),
            Err(e) => (
                Response::error(None, PickerError::InvalidArguments(e.to_string()).into()),
                Flow::Continue,
            ),
        }
    }

    pub fn dispatch(&mut self, request: Request) -> (Response, Flow) {
        let Request { id, method, args } = request;
        debug!(id, method = %method, "bridge request");

        let mut flow = Flow::Continue;
        let result: Result<Value, ApiError> = match method.as_str() {
            "startColorPicking" => self
                .picker
                .start(Some(self.completion()))
                .map(|()| Value::Null)
                .map_err(ApiError::from),
            "stopColorPicking" => {
                self.picker.stop();
                Ok(Value::Null)
            }
            "getMagnifiedImage" => parse_args::<MagnifyArgs>(args).and_then(|a| {
                self.picker
                    .magnify(a.x, a.y)
                    .map(|png| Value::String(base64::engine::general_purpose::STANDARD.encode(png)))
                    .map_err(ApiError::from)
            }),
            "saveCurrentColor" => {
                self.picker.save_current_color();
                Ok(Value::Null)
            }
            "updateHotkey" => {
                parse_args::<HotkeyArgs>(args).and_then(|a| self.update_hotkey(&a.chord))
            }
            "pickColor" => self
                .picker
                .pick_color()
                .map(|sample| json!(sample.color.to_array()))
                .map_err(ApiError::from),
            "shutdown" => {
                flow = Flow::Exit;
                Ok(Value::Null)
            }
            other => Err(ApiError::not_implemented(other)),
        };

        let response = match result {
            Ok(value) => Response::ok(id, value),
            Err(error) => {
                debug!(id, code = %error.code, "bridge request failed");
                Response::error(Some(id), error)
            }
        };
        (response, flow)
    }

    fn update_hotkey(&mut self, chord: &str) -> Result<Value, ApiError> {
        let chord = self.picker.update_hotkey(chord)?;
        self.config.hotkey = chord.to_string();
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save_to(path) {
                warn!(error = %e, "failed to persist hotkey");
            }
        }
        Ok(Value::String(chord.to_string()))
    }

    /// Reports the final sample of a session as a diagnostic line.
    fn completion(&self) -> Completion {
        let sink = self.sink.clone();
        Box::new(move |result: PickerResult<ColorSample>| match result {
            Ok(sample) => sink.log(&format!(
                "color picking finished: {} at ({:.0}, {:.0})",
                sample.color, sample.position.x, sample.position.y
            )),
            Err(e) => sink.log(&format!("color picking finished without a sample: {e}")),
        })
    }

    /// Serve requests until `shutdown` or end of input, then stop the engine.
    pub fn serve<R: BufRead, W: Write>(mut self, input: R, mut out: W) {
        info!("bridge serving requests");
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "failed to read request");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let (response, flow) = self.handle_line(&line);
            write_line(&mut out, &response);
            if flow == Flow::Exit {
                break;
            }
        }
        info!("bridge closing, shutting engine down");
        self.picker.shutdown();
    }
}

fn write_line<W: Write, T: Serialize>(out: &mut W, value: &T) {
    let written = serde_json::to_string(value)
        .map_err(|e| e.to_string())
        .and_then(|text| {
            writeln!(out, "{text}")
                .and_then(|()| out.flush())
                .map_err(|e| e.to_string())
        });
    if let Err(e) = written {
        warn!(error = %e, "failed to write output line");
    }
}

/// Forward engine events to `out` until every sender is gone.
pub fn write_events<W: Write>(events: Receiver<PickerEvent>, mut out: W) {
    for event in events.iter() {
        write_line(&mut out, &event);
    }
    debug!("event writer exiting");
}

/// Run [`write_events`] on its own thread. Join the handle after the last
/// sender is dropped so trailing events reach `out`.
pub fn spawn_event_writer<W: Write + Send + 'static>(
    events: Receiver<PickerEvent>,
    out: W,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("pipette-events".into())
        .spawn(move || write_events(events, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use pipette_core::{Point, Rgb};
    use std::cell::RefCell;

    fn sample() -> ColorSample {
        ColorSample {
            color: Rgb::new(12, 34, 56),
            position: Point::new(10.0, 20.0),
            screen_id: 1,
        }
    }

    #[derive(Default)]
    struct FakePicker {
        calls: RefCell<Vec<String>>,
        pending: RefCell<Option<Completion>>,
    }

    impl FakePicker {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
        fn record(&self, call: &str) {
            self.calls.borrow_mut().push(call.to_string());
        }
    }

    impl Picker for &FakePicker {
        fn start(&self, on_result: Option<Completion>) -> PickerResult<()> {
            self.record("start");
            *self.pending.borrow_mut() = on_result;
            Ok(())
        }
        fn stop(&self) {
            self.record("stop");
            if let Some(done) = self.pending.borrow_mut().take() {
                done(Ok(sample()));
            }
        }
        fn save_current_color(&self) {
            self.record("save");
        }
        fn pick_color(&self) -> PickerResult<ColorSample> {
            self.record("pick");
            Ok(sample())
        }
        fn magnify(&self, x: f64, y: f64) -> PickerResult<Vec<u8>> {
            self.record("magnify");
            if x < 0.0 || y < 0.0 {
                return Err(PickerError::ScreenNotFound);
            }
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
        fn update_hotkey(&self, chord: &str) -> PickerResult<HotkeyChord> {
            self.record("hotkey");
            HotkeyChord::parse(chord)
        }
        fn shutdown(&self) {
            self.record("shutdown");
        }
    }

    fn bridge(picker: &FakePicker) -> (Bridge<&FakePicker>, Receiver<PickerEvent>) {
        let (tx, rx) = bounded(16);
        let bridge = Bridge::new(picker, ChannelSink::new(tx), PickerConfig::default(), None);
        (bridge, rx)
    }

    fn call(bridge: &mut Bridge<&FakePicker>, line: &str) -> Value {
        serde_json::to_value(bridge.handle_line(line).0).unwrap()
    }

    #[test]
    fn test_session_methods_reach_the_engine() {
        let picker = FakePicker::default();
        let (mut bridge, events) = bridge(&picker);

        assert_eq!(
            call(&mut bridge, r#"{"id":1,"method":"startColorPicking"}"#),
            json!({"id": 1, "ok": null})
        );
        call(&mut bridge, r#"{"id":2,"method":"saveCurrentColor","args":{}}"#);
        call(&mut bridge, r#"{"id":3,"method":"stopColorPicking"}"#);

        assert_eq!(picker.calls(), vec!["start", "save", "stop"]);
        match events.try_recv().unwrap() {
            PickerEvent::Log { log } => assert!(log.contains("#0C2238"), "{log}"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_magnified_image_is_base64() {
        let picker = FakePicker::default();
        let (mut bridge, _events) = bridge(&picker);

        let value = call(
            &mut bridge,
            r#"{"id":7,"method":"getMagnifiedImage","args":{"x":5,"y":6.5}}"#,
        );
        let encoded = value["ok"].as_str().unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);

        let value = call(
            &mut bridge,
            r#"{"id":8,"method":"getMagnifiedImage","args":{"x":-5,"y":6}}"#,
        );
        assert_eq!(value["error"]["code"], "SCREEN_NOT_FOUND");
    }

    #[test]
    fn test_bad_requests() {
        let picker = FakePicker::default();
        let (mut bridge, _events) = bridge(&picker);

        let value = call(&mut bridge, r#"{"id":1,"method":"getMagnifiedImage","args":{"x":1}}"#);
        assert_eq!(value["id"], 1);
        assert_eq!(value["error"]["code"], "INVALID_ARGUMENTS");

        let value = call(&mut bridge, r#"{"id":2,"method":"openSettings"}"#);
        assert_eq!(value["error"]["code"], "NOT_IMPLEMENTED");

        let value = call(&mut bridge, "not json");
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], "INVALID_ARGUMENTS");

        assert!(picker.calls().is_empty());
    }

    #[test]
    fn test_update_hotkey_and_pick_color() {
        let picker = FakePicker::default();
        let (mut bridge, _events) = bridge(&picker);

        let value = call(
            &mut bridge,
            r#"{"id":1,"method":"updateHotkey","args":{"chord":"shift + cmd + k"}}"#,
        );
        assert_eq!(value["ok"], "Cmd + Shift + K");
        assert_eq!(bridge.config.hotkey, "Cmd + Shift + K");

        let value = call(
            &mut bridge,
            r#"{"id":2,"method":"updateHotkey","args":{"chord":"Cmd + Shift"}}"#,
        );
        assert_eq!(value["error"]["code"], "INVALID_CHORD");
        assert_eq!(bridge.config.hotkey, "Cmd + Shift + K");

        let value = call(&mut bridge, r#"{"id":3,"method":"pickColor"}"#);
        assert_eq!(value["ok"], json!([12, 34, 56]));
    }

    #[test]
    fn test_update_hotkey_persists_when_enabled() {
        let picker = FakePicker::default();
        let (tx, _rx) = bounded(1);
        let path = std::env::temp_dir()
            .join(format!("pipette-bridge-test-{}", std::process::id()))
            .join("config.yaml");
        let mut bridge = Bridge::new(
            &picker,
            ChannelSink::new(tx),
            PickerConfig::default(),
            Some(path.clone()),
        );

        call(
            &mut bridge,
            r#"{"id":1,"method":"updateHotkey","args":{"chord":"Ctrl + P"}}"#,
        );
        assert_eq!(PickerConfig::load_from(&path).hotkey, "Ctrl + P");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_serve_stops_on_shutdown() {
        let picker = FakePicker::default();
        let (bridge, _events) = bridge(&picker);
        let input = b"{\"id\":1,\"method\":\"pickColor\"}\n\n{\"id\":2,\"method\":\"shutdown\"}\n{\"id\":3,\"method\":\"pickColor\"}\n";
        let mut out = Vec::new();

        bridge.serve(&input[..], &mut out);

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], json!({"id": 2, "ok": null}));
        assert_eq!(picker.calls(), vec!["pick", "shutdown"]);
    }

    #[test]
    fn test_end_of_input_shuts_down() {
        let picker = FakePicker::default();
        let (bridge, _events) = bridge(&picker);
        bridge.serve(&b""[..], Vec::new());
        assert_eq!(picker.calls(), vec!["shutdown"]);
    }

    #[test]
    fn test_events_are_written_as_lines() {
        let (tx, rx) = bounded(4);
        tx.send(PickerEvent::ColorSaved { color: [1, 2, 3] }).unwrap();
        drop(tx);
        let mut out = Vec::new();
        write_events(rx, &mut out);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"event\":\"colorSaved\",\"payload\":{\"color\":[1,2,3]}}\n"
        );
    }

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_joined_writer_flushes_final_event() {
        let (tx, rx) = bounded(4);
        let out = SharedBuf::default();
        let writer = spawn_event_writer(rx, out.clone()).unwrap();

        ChannelSink::new(tx).log("color picking stopped");
        writer.join().unwrap();

        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            text,
            "{\"event\":\"log\",\"payload\":{\"log\":\"color picking stopped\"}}\n"
        );
    }
}
