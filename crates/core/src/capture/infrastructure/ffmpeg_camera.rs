use crate::capture::domain::camera::{CameraProvider, CameraStream, FrameSource, StreamConstraints};
use crate::shared::capture_error::CaptureError;
use crate::shared::constants::RGBA_CHANNELS;

/// Grants camera streams from a capture device or media URL via ffmpeg-next.
///
/// `input_format` names a libavdevice demuxer (`v4l2`, `avfoundation`,
/// `dshow`) and may be omitted for files and network URLs, which are probed.
pub struct FfmpegCameraProvider {
    url: String,
    input_format: Option<String>,
}

impl FfmpegCameraProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            input_format: None,
        }
    }

    pub fn with_input_format(mut self, format: impl Into<String>) -> Self {
        self.input_format = Some(format.into());
        self
    }

    fn open_input(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<ffmpeg_next::format::context::Input, CaptureError> {
        let mut options = ffmpeg_next::Dictionary::new();
        options.set(
            "video_size",
            &format!("{}x{}", constraints.ideal_width, constraints.ideal_height),
        );

        let unavailable = |e: ffmpeg_next::Error| CaptureError::camera(format!("{}: {e}", self.url));

        match &self.input_format {
            None => ffmpeg_next::format::input_with_dictionary(&self.url, options).map_err(unavailable),
            Some(name) => {
                let format = ffmpeg_next::device::input::video()
                    .find(|f| f.name() == name.as_str())
                    .ok_or_else(|| CaptureError::camera(format!("no capture backend named {name}")))?;
                let ctx = ffmpeg_next::format::open_with(
                    &self.url,
                    &ffmpeg_next::format::format::Format::Input(format),
                    options,
                )
                .map_err(unavailable)?;
                Ok(ctx.input())
            }
        }
    }
}

impl CameraProvider for FfmpegCameraProvider {
    fn acquire(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CaptureError> {
        ffmpeg_next::init().map_err(|e| CaptureError::camera(e.to_string()))?;
        ffmpeg_next::device::register_all();

        let ictx = self.open_input(constraints)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::camera(format!("{}: no video track", self.url)))?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| CaptureError::camera(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| CaptureError::camera(e.to_string()))?;

        log::info!(
            "Opened {} ({}x{}, {:?})",
            self.url,
            decoder.width(),
            decoder.height(),
            decoder.format()
        );

        Ok(Box::new(FfmpegCameraStream {
            open: Some(OpenStream {
                ictx,
                decoder,
                video_stream_index,
                scaler: None,
                decoded: ffmpeg_next::util::frame::video::Video::empty(),
                flushing: false,
            }),
            playing: false,
        }))
    }
}

struct Scaler {
    ctx: ffmpeg_next::software::scaling::Context,
    source: (ffmpeg_next::format::Pixel, u32, u32),
    target: (u32, u32),
}

struct OpenStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    video_stream_index: usize,
    scaler: Option<Scaler>,
    decoded: ffmpeg_next::util::frame::video::Video,
    flushing: bool,
}

/// A live ffmpeg input decoded to RGBA on demand.
///
/// Each read pulls at most one video packet, so a slow source surfaces as
/// [`CaptureError::FrameNotReady`] rather than blocking the tick loop on
/// several packets.
pub struct FfmpegCameraStream {
    open: Option<OpenStream>,
    playing: bool,
}

// Safety: FfmpegCameraStream is owned by one capture session and only
// touched from the thread driving its ticks. The raw pointers inside ffmpeg
// types are never shared across threads.
unsafe impl Send for FfmpegCameraStream {}

impl OpenStream {
    /// Decodes the next frame into `self.decoded`.
    fn decode_next(&mut self) -> Result<(), CaptureError> {
        if self.decoder.receive_frame(&mut self.decoded).is_ok() {
            return Ok(());
        }
        if self.flushing {
            return Err(CaptureError::camera("stream ended"));
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                self.flushing = true;
                self.decoder
                    .send_eof()
                    .map_err(|e| CaptureError::unknown(e.to_string()))?;
                return self
                    .decoder
                    .receive_frame(&mut self.decoded)
                    .map_err(|_| CaptureError::camera("stream ended"));
            };
            if stream.index() != self.video_stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .map_err(|e| CaptureError::unknown(e.to_string()))?;
            break;
        }

        self.decoder
            .receive_frame(&mut self.decoded)
            .map_err(|_| CaptureError::FrameNotReady)
    }

    /// Rebuilds the RGBA scaler when the decoded or requested size changed.
    fn ensure_scaler(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        let source = (
            self.decoded.format(),
            self.decoded.width(),
            self.decoded.height(),
        );
        let current = self
            .scaler
            .as_ref()
            .is_some_and(|s| s.source == source && s.target == (width, height));
        if current {
            return Ok(());
        }
        let ctx = ffmpeg_next::software::scaling::Context::get(
            source.0,
            source.1,
            source.2,
            ffmpeg_next::format::Pixel::RGBA,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| CaptureError::unknown(e.to_string()))?;
        self.scaler = Some(Scaler {
            ctx,
            source,
            target: (width, height),
        });
        Ok(())
    }
}

impl FrameSource for FfmpegCameraStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        let open = self.open.as_ref()?;
        let (w, h) = (open.decoder.width(), open.decoder.height());
        (w > 0 && h > 0).then_some((w, h))
    }

    fn read_pixels(
        &mut self,
        width: u32,
        height: u32,
        buffer: &mut Vec<u8>,
    ) -> Result<(), CaptureError> {
        let Some(open) = self.open.as_mut() else {
            return Err(CaptureError::camera("stream stopped"));
        };
        if !self.playing || width == 0 || height == 0 {
            return Err(CaptureError::FrameNotReady);
        }

        open.decode_next()?;

        open.ensure_scaler(width, height)?;
        let OpenStream { scaler, decoded, .. } = open;
        let scaler = scaler
            .as_mut()
            .ok_or_else(|| CaptureError::unknown("scaler missing"))?;
        let mut rgba = ffmpeg_next::util::frame::video::Video::empty();
        scaler
            .ctx
            .run(decoded, &mut rgba)
            .map_err(|e| CaptureError::unknown(e.to_string()))?;

        copy_rgba_pixels(&rgba, width, height, buffer);
        Ok(())
    }
}

impl CameraStream for FfmpegCameraStream {
    fn play(&mut self) -> Result<(), CaptureError> {
        if self.open.is_none() {
            return Err(CaptureError::camera("stream stopped"));
        }
        self.playing = true;
        Ok(())
    }

    fn stop_tracks(&mut self) {
        self.playing = false;
        if self.open.take().is_some() {
            log::debug!("Closed ffmpeg capture input");
        }
    }
}

/// Copies plane 0 of an RGBA frame into `buffer`, dropping row padding.
fn copy_rgba_pixels(
    rgba: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
    buffer: &mut Vec<u8>,
) {
    let stride = rgba.stride(0);
    let data = rgba.data(0);
    let row_len = width as usize * RGBA_CHANNELS as usize;

    buffer.clear();
    buffer.reserve(row_len * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        buffer.extend_from_slice(&data[row_start..row_start + row_len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
        ffmpeg_next::init().unwrap();
        let fps = 30;

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        let mut encoded = ffmpeg_next::Packet::empty();
        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let stride = rgb_frame.stride(0);
            let data = rgb_frame.data_mut(0);
            for row in 0..height as usize {
                for col in 0..width as usize {
                    let offset = row * stride + col * 3;
                    data[offset..offset + 3].copy_from_slice(&[200, 140, 110]);
                }
            }

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));
            encoder.send_frame(&yuv_frame).unwrap();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(&mut octx).unwrap();
            }
        }

        encoder.send_eof().unwrap();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
            encoded.write_interleaved(&mut octx).unwrap();
        }
        octx.write_trailer().unwrap();
    }

    fn read_until_frame(stream: &mut dyn CameraStream, w: u32, h: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        for _ in 0..20 {
            match stream.read_pixels(w, h, &mut buffer) {
                Ok(()) => return buffer,
                Err(CaptureError::FrameNotReady) => continue,
                Err(e) => panic!("unexpected read error: {e}"),
            }
        }
        panic!("no frame decoded");
    }

    #[test]
    fn test_nonexistent_source_is_camera_unavailable() {
        let mut provider = FfmpegCameraProvider::new("/nonexistent/camera.mp4");
        let result = provider.acquire(&StreamConstraints::default());
        assert!(matches!(result, Err(CaptureError::CameraUnavailable(Some(_)))));
    }

    #[test]
    fn test_unknown_backend_is_camera_unavailable() {
        let mut provider =
            FfmpegCameraProvider::new("/dev/video0").with_input_format("no-such-backend");
        let result = provider.acquire(&StreamConstraints::default());
        assert!(matches!(result, Err(CaptureError::CameraUnavailable(Some(_)))));
    }

    #[test]
    fn test_stream_reports_native_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camera.mp4");
        create_test_video(&path, 3, 160, 120);

        let mut provider = FfmpegCameraProvider::new(path.to_string_lossy());
        let stream = provider.acquire(&StreamConstraints::default()).unwrap();
        assert_eq!(stream.dimensions(), Some((160, 120)));
    }

    #[test]
    fn test_read_before_play_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camera.mp4");
        create_test_video(&path, 3, 160, 120);

        let mut provider = FfmpegCameraProvider::new(path.to_string_lossy());
        let mut stream = provider.acquire(&StreamConstraints::default()).unwrap();
        let mut buffer = Vec::new();
        assert_eq!(
            stream.read_pixels(160, 120, &mut buffer),
            Err(CaptureError::FrameNotReady)
        );
    }

    #[test]
    fn test_frames_decode_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camera.mp4");
        create_test_video(&path, 5, 160, 120);

        let mut provider = FfmpegCameraProvider::new(path.to_string_lossy());
        let mut stream = provider.acquire(&StreamConstraints::default()).unwrap();
        stream.play().unwrap();

        let pixels = read_until_frame(stream.as_mut(), 160, 120);
        assert_eq!(pixels.len(), 160 * 120 * 4);
        assert_eq!(pixels[3], 255);
    }

    #[test]
    fn test_exhausted_source_reports_stream_ended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camera.mp4");
        create_test_video(&path, 2, 64, 48);

        let mut provider = FfmpegCameraProvider::new(path.to_string_lossy());
        let mut stream = provider.acquire(&StreamConstraints::default()).unwrap();
        stream.play().unwrap();

        let mut buffer = Vec::new();
        let mut last = Ok(());
        for _ in 0..20 {
            last = stream.read_pixels(64, 48, &mut buffer);
            if matches!(last, Err(CaptureError::CameraUnavailable(_))) {
                break;
            }
        }
        assert_eq!(last, Err(CaptureError::camera("stream ended")));
    }

    #[test]
    fn test_stop_tracks_closes_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camera.mp4");
        create_test_video(&path, 2, 64, 48);

        let mut provider = FfmpegCameraProvider::new(path.to_string_lossy());
        let mut stream = provider.acquire(&StreamConstraints::default()).unwrap();
        stream.play().unwrap();
        stream.stop_tracks();
        stream.stop_tracks();

        assert_eq!(stream.dimensions(), None);
        let mut buffer = Vec::new();
        assert!(matches!(
            stream.read_pixels(64, 48, &mut buffer),
            Err(CaptureError::CameraUnavailable(_))
        ));
    }
}
