use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::coords::{ColorRgba, Viewport};

use super::api::{
    BlendFactor, Capability, DEFAULT_PIXEL_ALIGNMENT, GlApi, GlHandle, GpuObjectKind, MatrixShape,
    ShaderStage, TextureDataType, TextureFormat, TextureParameter, TextureParameterValue,
    UniformLocation, row_layout, transfer_len,
};

/// Value written to a uniform, as the device received it.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Int(i32),
    Float(Vec<f32>),
    Matrix(MatrixShape, Vec<f32>),
}

/// One recorded entry-point invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    Enable(Capability),
    Disable(Capability),
    BlendFunc(BlendFactor, BlendFactor),
    Clear(ColorRgba),
    Viewport(Viewport),
    ActiveTexture(u32),
    PixelAlignment(i32),
    CreateShader(ShaderStage, GlHandle),
    ShaderSource(GlHandle),
    CompileShader(GlHandle),
    DeleteShader(GlHandle),
    CreateProgram(GlHandle),
    AttachShader { program: GlHandle, shader: GlHandle },
    DetachShader { program: GlHandle, shader: GlHandle },
    LinkProgram(GlHandle),
    UseProgram(GlHandle),
    GetCurrentProgram,
    GetUniformLocation { program: GlHandle, name: String },
    Uniform { location: UniformLocation, data: UniformData },
    CreateTexture(GlHandle),
    BindTexture(GlHandle),
    TexImage2D {
        width: i32,
        height: i32,
        internal_format: TextureFormat,
        format: TextureFormat,
        data_type: TextureDataType,
    },
    GenerateMipmap,
    TexParameter(TextureParameter, TextureParameterValue),
    GetTexImage { format: TextureFormat, data_type: TextureDataType },
    DeleteObjects { kind: GpuObjectKind, handles: Vec<GlHandle> },
}

#[derive(Debug)]
struct ShaderObject {
    source: String,
    compiled: bool,
    stage: ShaderStage,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<GlHandle>,
    linked: bool,
    log: String,
    uniforms: Vec<String>,
    values: HashMap<UniformLocation, UniformData>,
}

#[derive(Debug)]
struct TextureObject {
    width: i32,
    height: i32,
    format: TextureFormat,
    data_type: TextureDataType,
    data: Vec<u8>,
    mipmapped: bool,
    params: HashMap<TextureParameter, TextureParameterValue>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<GlCall>,
    last_handle: GlHandle,
    shaders: HashMap<GlHandle, ShaderObject>,
    programs: HashMap<GlHandle, ProgramObject>,
    textures: HashMap<GlHandle, TextureObject>,
    current_program: GlHandle,
    bound_texture: GlHandle,
    enabled: HashSet<Capability>,
    viewport: Viewport,
    /// `None` until set; GL starts at [`DEFAULT_PIXEL_ALIGNMENT`].
    pixel_alignment: Option<usize>,
    errors: Vec<String>,
}

impl State {
    fn next_handle(&mut self) -> GlHandle {
        self.last_handle += 1;
        self.last_handle
    }

    fn pixel_alignment(&self) -> usize {
        self.pixel_alignment.unwrap_or(DEFAULT_PIXEL_ALIGNMENT)
    }
}

/// Software device that records every call.
///
/// `HeadlessGl` keeps enough state to behave like a driver for the engine's
/// purposes: shaders are syntax-checked, programs collect their uniform
/// declarations at link time, textures hold their pixels and uniform writes
/// land in the current program. Every entry point is appended to a call log
/// that tests inspect.
///
/// It also serves as a device for headless runs (CI, servers).
#[derive(Debug, Default)]
pub struct HeadlessGl {
    state: RefCell<State>,
    missing: Vec<&'static str>,
}

impl HeadlessGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that reports `names` as unresolved entry points.
    pub fn with_missing_entry_points(names: Vec<&'static str>) -> Self {
        Self {
            state: RefCell::default(),
            missing: names,
        }
    }

    // ── call log ──────────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn call_count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    /// Number of uniform uploads of any type.
    pub fn uniform_writes(&self) -> usize {
        self.call_count(|c| matches!(c, GlCall::Uniform { .. }))
    }

    /// Number of location lookups for `name`.
    pub fn location_queries(&self, name: &str) -> usize {
        self.call_count(|c| matches!(c, GlCall::GetUniformLocation { name: n, .. } if n == name))
    }

    /// Handle lists of every batched delete issued for `kind`, in order.
    pub fn delete_batches(&self, kind: GpuObjectKind) -> Vec<Vec<GlHandle>> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                GlCall::DeleteObjects { kind: k, handles } if *k == kind => Some(handles.clone()),
                _ => None,
            })
            .collect()
    }

    // ── device state ──────────────────────────────────────────────────────

    /// Current program without recording a query.
    pub fn bound_program(&self) -> GlHandle {
        self.state.borrow().current_program
    }

    pub fn bound_texture(&self) -> GlHandle {
        self.state.borrow().bound_texture
    }

    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.state.borrow().enabled.contains(&cap)
    }

    pub fn current_viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    pub fn is_program(&self, program: GlHandle) -> bool {
        self.state.borrow().programs.contains_key(&program)
    }

    /// Row alignment currently applied to pixel transfers.
    pub fn current_pixel_alignment(&self) -> usize {
        self.state.borrow().pixel_alignment()
    }

    /// Calls the device refused, in order, with the reason.
    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    /// Last value written to `name` in `program`.
    pub fn uniform_value(&self, program: GlHandle, name: &str) -> Option<UniformData> {
        let state = self.state.borrow();
        let p = state.programs.get(&program)?;
        let loc = p.uniforms.iter().position(|u| u == name)? as UniformLocation;
        p.values.get(&loc).cloned()
    }

    pub fn texture_size(&self, texture: GlHandle) -> Option<(i32, i32)> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|t| (t.width, t.height))
    }

    pub fn texture_data(&self, texture: GlHandle) -> Option<Vec<u8>> {
        self.state.borrow().textures.get(&texture).map(|t| t.data.clone())
    }

    pub fn texture_mipmapped(&self, texture: GlHandle) -> bool {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .is_some_and(|t| t.mipmapped)
    }

    pub fn texture_parameter(
        &self,
        texture: GlHandle,
        param: TextureParameter,
    ) -> Option<TextureParameterValue> {
        self.state
            .borrow()
            .textures
            .get(&texture)?
            .params
            .get(&param)
            .copied()
    }

    fn record(&self, call: GlCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn write_uniform(&self, location: UniformLocation, data: UniformData) {
        let mut state = self.state.borrow_mut();
        let current = state.current_program;
        if let Some(p) = state.programs.get_mut(&current) {
            if p.linked && (0..p.uniforms.len() as UniformLocation).contains(&location) {
                p.values.insert(location, data.clone());
            }
        }
        state.calls.push(GlCall::Uniform { location, data });
    }
}

/// Rejects sources without an entry point or with unbalanced delimiters.
fn check_syntax(source: &str) -> Result<(), String> {
    let mut braces = 0i32;
    let mut parens = 0i32;
    for (line_no, line) in source.lines().enumerate() {
        let code = line.split("//").next().unwrap_or_default();
        for ch in code.chars() {
            match ch {
                '{' => braces += 1,
                '}' => braces -= 1,
                '(' => parens += 1,
                ')' => parens -= 1,
                _ => {}
            }
            if braces < 0 || parens < 0 {
                return Err(format!("ERROR: 0:{}: syntax error, unexpected '{ch}'", line_no + 1));
            }
        }
    }
    if braces != 0 || parens != 0 {
        let lines = source.lines().count().max(1);
        return Err(format!("ERROR: 0:{lines}: syntax error, unexpected end of file"));
    }
    if !source.contains("void main") {
        return Err("ERROR: 0:1: no function with name 'main' defined".to_string());
    }
    Ok(())
}

/// Names declared with `uniform <type> <name>` in declaration order.
fn uniform_names(source: &str) -> Vec<String> {
    let code: String = source
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .map(|l| l.split("//").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");

    code.split(';')
        .filter_map(|stmt| {
            let stmt = stmt.trim_start_matches(|c: char| c == '}' || c.is_whitespace());
            let mut tokens = stmt.split_whitespace();
            if tokens.next() != Some("uniform") {
                return None;
            }
            let _ty = tokens.next()?;
            let name = tokens.next()?;
            let name = name.split(['[', '=']).next().unwrap_or_default();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

impl GlApi for HeadlessGl {
    fn backend_name(&self) -> &'static str {
        "headless"
    }

    fn missing_entry_points(&self) -> Vec<&'static str> {
        self.missing.clone()
    }

    fn enable(&self, cap: Capability) {
        let mut state = self.state.borrow_mut();
        state.enabled.insert(cap);
        state.calls.push(GlCall::Enable(cap));
    }

    fn disable(&self, cap: Capability) {
        let mut state = self.state.borrow_mut();
        state.enabled.remove(&cap);
        state.calls.push(GlCall::Disable(cap));
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        self.record(GlCall::BlendFunc(src, dst));
    }

    fn clear(&self, color: ColorRgba) {
        self.record(GlCall::Clear(color));
    }

    fn viewport(&self, viewport: Viewport) {
        let mut state = self.state.borrow_mut();
        state.viewport = viewport;
        state.calls.push(GlCall::Viewport(viewport));
    }

    fn active_texture_unit(&self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn pixel_alignment(&self, alignment: i32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(GlCall::PixelAlignment(alignment));
        match alignment {
            1 | 2 | 4 | 8 => state.pixel_alignment = Some(alignment as usize),
            other => state.errors.push(format!("pixel_alignment: invalid value {other}")),
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<GlHandle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.next_handle();
        state.shaders.insert(
            id,
            ShaderObject {
                source: String::new(),
                compiled: false,
                stage,
                log: String::new(),
            },
        );
        state.calls.push(GlCall::CreateShader(stage, id));
        Ok(id)
    }

    fn shader_source(&self, shader: GlHandle, source: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(s) = state.shaders.get_mut(&shader) {
            s.source = source.to_string();
        }
        state.calls.push(GlCall::ShaderSource(shader));
    }

    fn compile_shader(&self, shader: GlHandle) -> bool {
        let mut state = self.state.borrow_mut();
        state.calls.push(GlCall::CompileShader(shader));
        let Some(s) = state.shaders.get_mut(&shader) else {
            return false;
        };
        match check_syntax(&s.source) {
            Ok(()) => {
                s.compiled = true;
                s.log.clear();
            }
            Err(log) => {
                s.compiled = false;
                s.log = log;
            }
        }
        s.compiled
    }

    fn shader_info_log(&self, shader: GlHandle) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: GlHandle) {
        let mut state = self.state.borrow_mut();
        state.shaders.remove(&shader);
        state.calls.push(GlCall::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<GlHandle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.next_handle();
        state.programs.insert(id, ProgramObject::default());
        state.calls.push(GlCall::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: GlHandle, shader: GlHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(p) = state.programs.get_mut(&program) {
            p.attached.push(shader);
        }
        state.calls.push(GlCall::AttachShader { program, shader });
    }

    fn detach_shader(&self, program: GlHandle, shader: GlHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(p) = state.programs.get_mut(&program) {
            p.attached.retain(|&s| s != shader);
        }
        state.calls.push(GlCall::DetachShader { program, shader });
    }

    fn link_program(&self, program: GlHandle) -> bool {
        let mut state = self.state.borrow_mut();
        state.calls.push(GlCall::LinkProgram(program));

        let Some(attached) = state.programs.get(&program).map(|p| p.attached.clone()) else {
            return false;
        };

        let mut stages = HashSet::new();
        let mut uniforms: Vec<String> = Vec::new();
        let mut log = String::new();
        for id in &attached {
            match state.shaders.get(id) {
                Some(s) if s.compiled => {
                    stages.insert(s.stage);
                    for name in uniform_names(&s.source) {
                        if !uniforms.contains(&name) {
                            uniforms.push(name);
                        }
                    }
                }
                _ => log = format!("error: attached shader {id} is not compiled"),
            }
        }
        if log.is_empty() && !stages.contains(&ShaderStage::Vertex) {
            log = "error: program has no vertex shader".to_string();
        }
        if log.is_empty() && !stages.contains(&ShaderStage::Fragment) {
            log = "error: program has no fragment shader".to_string();
        }

        let Some(p) = state.programs.get_mut(&program) else {
            return false;
        };
        p.linked = log.is_empty();
        p.log = log;
        p.values.clear();
        p.uniforms = if p.linked { uniforms } else { Vec::new() };
        p.linked
    }

    fn program_info_log(&self, program: GlHandle) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: GlHandle) {
        let mut state = self.state.borrow_mut();
        state.current_program = program;
        state.calls.push(GlCall::UseProgram(program));
    }

    fn current_program(&self) -> GlHandle {
        let mut state = self.state.borrow_mut();
        state.calls.push(GlCall::GetCurrentProgram);
        state.current_program
    }

    fn uniform_location(&self, program: GlHandle, name: &str) -> Option<UniformLocation> {
        let mut state = self.state.borrow_mut();
        state.calls.push(GlCall::GetUniformLocation {
            program,
            name: name.to_string(),
        });
        let p = state.programs.get(&program).filter(|p| p.linked)?;
        p.uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| i as UniformLocation)
    }

    fn uniform_1_i32(&self, location: UniformLocation, v: i32) {
        self.write_uniform(location, UniformData::Int(v));
    }

    fn uniform_1_f32(&self, location: UniformLocation, v: f32) {
        self.write_uniform(location, UniformData::Float(vec![v]));
    }

    fn uniform_2_f32(&self, location: UniformLocation, x: f32, y: f32) {
        self.write_uniform(location, UniformData::Float(vec![x, y]));
    }

    fn uniform_3_f32(&self, location: UniformLocation, x: f32, y: f32, z: f32) {
        self.write_uniform(location, UniformData::Float(vec![x, y, z]));
    }

    fn uniform_4_f32(&self, location: UniformLocation, x: f32, y: f32, z: f32, w: f32) {
        self.write_uniform(location, UniformData::Float(vec![x, y, z, w]));
    }

    fn uniform_matrix(&self, location: UniformLocation, shape: MatrixShape, data: &[f32]) {
        self.write_uniform(location, UniformData::Matrix(shape, data.to_vec()));
    }

    fn create_texture(&self) -> Result<GlHandle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.next_handle();
        state.textures.insert(
            id,
            TextureObject {
                width: 0,
                height: 0,
                format: TextureFormat::Rgba,
                data_type: TextureDataType::UnsignedByte,
                data: Vec::new(),
                mipmapped: false,
                params: HashMap::new(),
            },
        );
        state.calls.push(GlCall::CreateTexture(id));
        Ok(id)
    }

    fn bind_texture(&self, texture: GlHandle) {
        let mut state = self.state.borrow_mut();
        state.bound_texture = texture;
        state.calls.push(GlCall::BindTexture(texture));
    }

    fn tex_image_2d(
        &self,
        width: i32,
        height: i32,
        internal_format: TextureFormat,
        format: TextureFormat,
        data_type: TextureDataType,
        data: Option<&[u8]>,
    ) {
        let mut state = self.state.borrow_mut();
        state.calls.push(GlCall::TexImage2D {
            width,
            height,
            internal_format,
            format,
            data_type,
        });

        let (w, h) = (width.max(0) as usize, height.max(0) as usize);
        let (row, stride) = row_layout(w, format.channels() * data_type.size(), state.pixel_alignment());
        let mut pixels = vec![0u8; row * h];
        if let Some(src) = data {
            let needed = transfer_len(row, stride, h);
            if src.len() < needed {
                state.errors.push(format!(
                    "tex_image_2d: {} bytes supplied, {needed} required",
                    src.len()
                ));
                return;
            }
            if row > 0 {
                for (r, dst) in pixels.chunks_exact_mut(row).enumerate() {
                    dst.copy_from_slice(&src[r * stride..r * stride + row]);
                }
            }
        }

        let bound = state.bound_texture;
        let Some(t) = state.textures.get_mut(&bound) else {
            return;
        };
        t.width = width;
        t.height = height;
        t.format = format;
        t.data_type = data_type;
        t.data = pixels;
        t.mipmapped = false;
    }

    fn generate_mipmap(&self) {
        let mut state = self.state.borrow_mut();
        let bound = state.bound_texture;
        if let Some(t) = state.textures.get_mut(&bound) {
            t.mipmapped = true;
        }
        state.calls.push(GlCall::GenerateMipmap);
    }

    fn tex_parameter(&self, param: TextureParameter, value: TextureParameterValue) {
        let mut state = self.state.borrow_mut();
        let bound = state.bound_texture;
        if let Some(t) = state.textures.get_mut(&bound) {
            t.params.insert(param, value);
        }
        state.calls.push(GlCall::TexParameter(param, value));
    }

    fn get_tex_image(&self, format: TextureFormat, data_type: TextureDataType, out: &mut [u8]) {
        let mut state = self.state.borrow_mut();
        state.calls.push(GlCall::GetTexImage { format, data_type });

        let alignment = state.pixel_alignment();
        let State {
            textures,
            bound_texture,
            errors,
            ..
        } = &mut *state;
        let Some(t) = textures.get(&*bound_texture) else {
            return;
        };

        let (w, h) = (t.width.max(0) as usize, t.height.max(0) as usize);
        let (row, stride) = row_layout(w, format.channels() * data_type.size(), alignment);
        let needed = transfer_len(row, stride, h);
        if out.len() < needed {
            errors.push(format!(
                "get_tex_image: {} bytes of room, {needed} required",
                out.len()
            ));
            return;
        }

        let src_c = t.format.channels();
        let dst_c = format.channels();
        if src_c == dst_c && t.data_type == data_type {
            if row > 0 {
                for (r, src) in t.data.chunks_exact(row).enumerate() {
                    out[r * stride..r * stride + row].copy_from_slice(src);
                }
            }
            return;
        }
        if t.data_type != TextureDataType::UnsignedByte || data_type != TextureDataType::UnsignedByte {
            errors.push("get_tex_image: conversion needs unsigned byte data".to_string());
            return;
        }

        for y in 0..h {
            for x in 0..w {
                let p = y * w + x;
                let src = &t.data[p * src_c..(p + 1) * src_c];
                let at = y * stride + x * dst_c;
                for (c, byte) in out[at..at + dst_c].iter_mut().enumerate() {
                    *byte = match src.get(c) {
                        Some(&v) => v,
                        None if c == 3 => 255,
                        None => 0,
                    };
                }
            }
        }
    }

    fn delete_objects(&self, kind: GpuObjectKind, handles: &[GlHandle]) {
        let mut state = self.state.borrow_mut();
        for h in handles {
            match kind {
                GpuObjectKind::Texture => {
                    state.textures.remove(h);
                    if state.bound_texture == *h {
                        state.bound_texture = 0;
                    }
                }
                GpuObjectKind::Program => {
                    state.programs.remove(h);
                }
                _ => {}
            }
        }
        state.calls.push(GlCall::DeleteObjects {
            kind,
            handles: handles.to_vec(),
        });
    }
}
