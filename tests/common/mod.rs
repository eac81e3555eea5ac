#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

/// A deterministic non-sentinel 128-bit body line.
pub fn body_line(tag: u64) -> String {
    format!("{tag:0128b}")
}

pub fn sentinel_line() -> String {
    "1".repeat(128)
}

/// `count` distinct body lines starting at `base`, newline-terminated.
pub fn blob(base: u64, count: usize) -> String {
    let mut out = String::new();
    for k in 0..count {
        out.push_str(&body_line(base + k as u64));
        out.push('\n');
    }
    out
}

/// A storage-controller configuration triple: line 1 starts with `011` and
/// carries `dw` at bits 23..24, line 3 carries `work_mode` at bits 113..114.
pub fn config_triple(dw: u32, work_mode: u32, tag: u64) -> [String; 3] {
    let mut line1 = String::from("011");
    line1.push_str(&"0".repeat(20));
    line1.push_str(&format!("{dw:02b}"));
    line1.push_str(&"0".repeat(103));
    let line2 = body_line(tag);
    let mut line3 = "0".repeat(113);
    line3.push_str(&format!("{work_mode:02b}"));
    line3.push_str(&"0".repeat(13));
    [line1, line2, line3]
}

pub fn write_library_entry(
    root: &Path,
    name: &str,
    info: &Value,
    op_blob: Option<&str>,
    weight_blob: Option<&str>,
    output_blob: Option<&str>,
) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("info.json"), serde_json::to_string_pretty(info).unwrap()).unwrap();
    if let Some(content) = op_blob {
        fs::write(dir.join("op_jili.txt"), content).unwrap();
    }
    if let Some(content) = weight_blob {
        fs::write(dir.join("weight_data.txt"), content).unwrap();
    }
    if let Some(content) = output_blob {
        fs::write(dir.join("output_data.txt"), content).unwrap();
    }
}

pub fn conv_info(
    in_channels: usize,
    out_slice: usize,
    in_wh: (usize, usize),
    out_wh: (usize, usize),
    kernel: (usize, usize),
    stride: usize,
    padding: usize,
    weight_lines: usize,
    output_lines: usize,
) -> Value {
    json!({
        "operator_type": "Conv",
        "input_channels": in_channels,
        "output_channels": out_slice,
        "kernel_size": [kernel.0, kernel.1],
        "stride": [stride, stride],
        "padding": [padding, padding],
        "input_tensor_shape": [in_wh.0, in_wh.1, in_channels],
        "output_tensor_shape": [out_wh.0, out_wh.1, out_slice],
        "weight_data": weight_lines,
        "output_data": output_lines,
    })
}

pub fn pool_info(
    in_channels: usize,
    out_channels: usize,
    in_wh: (usize, usize),
    out_wh: (usize, usize),
    kernel: (usize, usize),
    stride: usize,
    output_lines: usize,
) -> Value {
    json!({
        "operator_type": "Pool",
        "input_channels": in_channels,
        "output_channels": out_channels,
        "kernel_size": [kernel.0, kernel.1],
        "stride": [stride, stride],
        "input_tensor_shape": [in_wh.0, in_wh.1, in_channels],
        "output_tensor_shape": [out_wh.0, out_wh.1, out_channels],
        "output_data": output_lines,
    })
}

pub fn fc_info(
    in_features: usize,
    out_slice: usize,
    is_prev_fc: bool,
    weight_lines: usize,
    output_lines: usize,
) -> Value {
    json!({
        "operator_type": "FC",
        "in_features": [in_features],
        "out_features": [out_slice],
        "isPrevFC": is_prev_fc,
        "weight_data": weight_lines,
        "output_data": output_lines,
    })
}

/// Checks that every line of the file is exactly 128 characters of 0/1.
pub fn assert_stream_well_formed(path: &Path) {
    let content = fs::read_to_string(path).unwrap();
    for (idx, line) in content.lines().enumerate() {
        assert_eq!(line.len(), 128, "{}: line {} has wrong width", path.display(), idx + 1);
        assert!(
            line.bytes().all(|b| b == b'0' || b == b'1'),
            "{}: line {} has non-binary characters",
            path.display(),
            idx + 1
        );
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}
