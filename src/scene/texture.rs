//! GPU texture creation: image uploads, generated fallbacks and the depth
//! buffer.

use anyhow::Result;
use image::GenericImageView;

/// A texture with its view and sampler, ready to slot into a bind group.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Decode an image file's bytes and upload it. `format` is an optional
    /// extension hint ("png", "jpg"); without it the format is sniffed.
    /// Normal maps upload linear, everything else sRGB.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let img = match format.and_then(image::ImageFormat::from_extension) {
            Some(fmt) => image::load_from_memory_with_format(bytes, fmt)?,
            None => image::load_from_memory(bytes)?,
        };
        Ok(Self::from_image(device, queue, &img, Some(label), is_normal_map))
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        is_normal_map: bool,
    ) -> Self {
        let (width, height) = img.dimensions();
        let format = if is_normal_map {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };
        Self::upload(device, queue, &img.to_rgba8(), width, height, format, label)
    }

    /// A 1x1 solid color, used when a material has no diffuse map.
    pub fn solid(rgba: [u8; 4], device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::upload(
            device,
            queue,
            &rgba,
            1,
            1,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            Some("solid"),
        )
    }

    /// A 1x1 neutral normal map (straight up in tangent space), so every
    /// material can go through the normal-mapped pipeline.
    pub fn neutral_normal(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::upload(
            device,
            queue,
            &[127, 127, 255, 255],
            1,
            1,
            wgpu::TextureFormat::Rgba8Unorm,
            Some("neutral_normal"),
        )
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// The depth attachment, recreated on every resize.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}
