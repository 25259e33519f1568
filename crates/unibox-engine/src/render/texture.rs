use crate::device::{
    GlHandle, GpuObjectKind, TextureDataType, TextureFormat, TextureParameter,
    TextureParameterValue,
};

use super::{GlContext, Image, RenderError, Renderer};

/// 2D texture on a GL renderer.
///
/// The device object is created lazily by the first upload. Operations that
/// need the texture bound bind it themselves and leave the binding as they
/// found it: a texture entered unbound is unbound again afterwards.
///
/// Pixel data is tightly packed (the renderer sets a row alignment of 1).
pub struct Texture {
    ctx: GlContext,
    id: GlHandle,
    width: u32,
    height: u32,
    channels: u32,
    bound: bool,
}

impl Texture {
    pub fn new(renderer: &dyn Renderer) -> Result<Self, RenderError> {
        let Some(ctx) = renderer.gl_context() else {
            let err = RenderError::UnsupportedBackend {
                renderer: renderer.name().to_string(),
            };
            log::error!("Texture::new: {err}");
            return Err(err);
        };
        Ok(Self {
            ctx,
            id: 0,
            width: 1,
            height: 1,
            channels: 4,
            bound: false,
        })
    }

    pub fn id(&self) -> GlHandle {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn begin(&mut self) {
        self.ctx.gl().bind_texture(self.id);
        self.bound = true;
    }

    pub fn end(&mut self) {
        self.ctx.gl().bind_texture(0);
        self.bound = false;
    }

    /// Uploads `image` with mipmaps; the format follows its channel count.
    pub fn load(&mut self, image: &Image) -> Result<(), RenderError> {
        let format = TextureFormat::from_channels(image.channels);
        self.set_data(
            image.width,
            image.height,
            Some(&image.data),
            true,
            format,
            format,
            TextureDataType::UnsignedByte,
        )
    }

    /// Replaces the pixel data.
    ///
    /// A size change retires the current device object and creates a new
    /// one; otherwise the existing object is updated in place. `data`
    /// shorter than `width * height` pixels of `data_format` and `data_type`
    /// is rejected before anything changes.
    #[allow(clippy::too_many_arguments)]
    pub fn set_data(
        &mut self,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
        use_mipmap: bool,
        tex_format: TextureFormat,
        data_format: TextureFormat,
        data_type: TextureDataType,
    ) -> Result<(), RenderError> {
        if let Some(data) = data {
            let expected = (width as usize)
                .checked_mul(height as usize)
                .and_then(|n| n.checked_mul(data_format.channels() * data_type.size()))
                .unwrap_or(usize::MAX);
            if data.len() < expected {
                let err = RenderError::PixelData { expected, actual: data.len() };
                log::error!("Texture::set_data: {err}");
                return Err(err);
            }
        }

        let was_bound = self.bound;
        if self.width != width || self.height != height {
            self.destroy_device_object();
        }

        let gl = self.ctx.gl();
        if self.id == 0 {
            let id = gl.create_texture().map_err(|err| {
                log::error!("Texture::set_data: failed to create texture: {err}");
                RenderError::Device(err)
            })?;
            self.id = id;
            // A new object is never the bound one.
            self.bound = false;
        }
        self.width = width;
        self.height = height;
        if !self.bound {
            gl.bind_texture(self.id);
        }

        gl.tex_image_2d(
            width as i32,
            height as i32,
            tex_format,
            data_format,
            data_type,
            data,
        );
        if use_mipmap {
            gl.generate_mipmap();
        }
        self.channels = tex_format.channels() as u32;

        if was_bound {
            self.bound = true;
        } else {
            gl.bind_texture(0);
            self.bound = false;
        }
        Ok(())
    }

    /// Reads the pixels back as an 8-bit image with `channels` channels
    /// (anything outside 1 to 4 reads RGBA).
    pub fn get_image(&mut self, channels: u32) -> Image {
        let format = TextureFormat::from_channels(channels);
        let channels = format.channels();
        let mut data = vec![0u8; self.width as usize * self.height as usize * channels];

        let gl = self.ctx.gl();
        if !self.bound {
            gl.bind_texture(self.id);
        }
        gl.get_tex_image(format, TextureDataType::UnsignedByte, &mut data);
        if !self.bound {
            gl.bind_texture(0);
        }

        Image::new(self.width, self.height, channels as u32, data)
    }

    pub fn set_filter(&mut self, param: TextureParameter, value: TextureParameterValue) {
        let gl = self.ctx.gl();
        if !self.bound {
            gl.bind_texture(self.id);
        }
        gl.tex_parameter(param, value);
        if !self.bound {
            gl.bind_texture(0);
        }
    }

    pub fn set_linear(&mut self) {
        self.set_filter(TextureParameter::MinFilter, TextureParameterValue::Linear);
        self.set_filter(TextureParameter::MagFilter, TextureParameterValue::Linear);
    }

    pub fn set_pixelized(&mut self) {
        self.set_filter(TextureParameter::MinFilter, TextureParameterValue::Nearest);
        self.set_filter(TextureParameter::MagFilter, TextureParameterValue::Nearest);
    }

    /// Unbinds and retires the device object through the graveyard.
    ///
    /// Always leaves the texture unbound, including when no object exists.
    fn destroy_device_object(&mut self) {
        if self.id != 0 {
            if self.bound {
                self.ctx.gl().bind_texture(0);
            }
            self.ctx.defer_delete(GpuObjectKind::Texture, self.id);
            self.id = 0;
        }
        self.bound = false;
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.destroy_device_object();
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("bound", &self.bound)
            .finish()
    }
}
