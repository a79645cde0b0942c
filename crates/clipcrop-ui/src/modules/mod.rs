// crates/clipcrop-ui/src/modules/mod.rs
//
// Panels of the trim + crop screen. To add one:
//   1. Create modules/mypanel.rs implementing EditorModule
//   2. Add `pub mod mypanel;` below
//   3. Give ClipCropApp a field for it and call ui() from update()

pub mod export;
pub mod preview;
pub mod timeline;

use std::sync::Arc;

use clipcrop_core::commands::EditorCommand;
use clipcrop_media::{EditSession, PreviewFrame};
use egui::{ColorImage, Context, TextureHandle, TextureOptions, Ui};
use image::RgbaImage;

/// Every panel implements this. Panels read the session and emit commands;
/// they never mutate it directly.
pub trait EditorModule {
    fn name(&self) -> &str;
    fn ui(
        &mut self,
        ui:       &mut Ui,
        session:  &EditSession,
        textures: &TextureCache,
        cmd:      &mut Vec<EditorCommand>,
    );
}

// ── TextureCache ─────────────────────────────────────────────────────────────

/// One strip tile on the GPU. Placeholders are drawn as a flat fill instead.
pub struct ThumbTexture {
    pub texture:     TextureHandle,
    pub placeholder: bool,
}

/// GPU copies of what the session and the preview thread produce.
#[derive(Default)]
pub struct TextureCache {
    pub thumbs:  Vec<ThumbTexture>,
    pub preview: Option<TextureHandle>,
    /// Last in-memory frame uploaded, so an unchanged GIF frame is not
    /// re-sent every repaint.
    preview_src: Option<Arc<RgbaImage>>,
}

impl TextureCache {
    pub fn clear(&mut self) {
        self.thumbs.clear();
        self.preview     = None;
        self.preview_src = None;
    }

    pub fn load_thumbnails(&mut self, ctx: &Context, frames: &[PreviewFrame]) {
        self.thumbs = frames
            .iter()
            .enumerate()
            .map(|(i, f)| ThumbTexture {
                texture:     ctx.load_texture(format!("thumb_{i}"), to_color_image(&f.image), TextureOptions::LINEAR),
                placeholder: f.placeholder,
            })
            .collect();
    }

    /// Upload raw RGBA from the preview thread.
    pub fn set_preview_rgba(&mut self, ctx: &Context, width: u32, height: u32, data: &[u8]) {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            log::warn!("[app] preview frame {width}x{height} has {} bytes, expected {expected}", data.len());
            return;
        }
        let image = ColorImage::from_rgba_unmultiplied([width as usize, height as usize], data);
        self.preview_src = None;
        self.put_preview(ctx, image);
    }

    /// Upload an in-memory frame unless it is the one already showing.
    pub fn set_preview_image(&mut self, ctx: &Context, frame: Arc<RgbaImage>) {
        if self.preview_src.as_ref().is_some_and(|last| Arc::ptr_eq(last, &frame)) {
            return;
        }
        self.put_preview(ctx, to_color_image(&frame));
        self.preview_src = Some(frame);
    }

    fn put_preview(&mut self, ctx: &Context, image: ColorImage) {
        match self.preview.as_mut() {
            Some(tex) => tex.set(image, TextureOptions::LINEAR),
            None      => self.preview = Some(ctx.load_texture("preview", image, TextureOptions::LINEAR)),
        }
    }
}

fn to_color_image(img: &RgbaImage) -> ColorImage {
    let (w, h) = img.dimensions();
    ColorImage::from_rgba_unmultiplied([w as usize, h as usize], img.as_raw())
}
