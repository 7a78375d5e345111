//! Safe wrappers around FFmpeg FFI calls.
//!
//! All `unsafe` blocks needed for routine media access live here with an
//! explicit safety argument. Callers outside this module never write `unsafe`.

use ffmpeg_next as ffmpeg;

// ── Codec-parameter field accessors ─────────────────────────────────────────

/// Read `sample_rate` from an `AVCodecParameters` struct.
pub fn codec_params_sample_rate(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    // SAFETY: `params.as_ptr()` returns a valid non-null pointer for the
    // lifetime of `params`. `sample_rate` is a plain i32 field.
    unsafe { (*params.as_ptr()).sample_rate.max(0) as u32 }
}

/// Read `ch_layout.nb_channels` from an `AVCodecParameters` struct.
pub fn codec_params_channels(params: &ffmpeg::codec::parameters::Parameters) -> u16 {
    // SAFETY: same as `codec_params_sample_rate`.
    unsafe { (*params.as_ptr()).ch_layout.nb_channels.max(0) as u16 }
}

/// Read `width` from an `AVCodecParameters` struct.
pub fn codec_params_width(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    unsafe { (*params.as_ptr()).width.max(0) as u32 }
}

/// Read `height` from an `AVCodecParameters` struct.
pub fn codec_params_height(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    unsafe { (*params.as_ptr()).height.max(0) as u32 }
}

/// Zero out `codec_tag` on the `AVCodecParameters` attached to an output
/// stream, so the muxer picks the correct tag for the target container.
///
/// Must be called after `out_stream.set_parameters(...)` and before
/// `write_header`.
pub fn stream_reset_codec_tag(out_stream: &mut ffmpeg::format::stream::StreamMut) {
    // SAFETY: `out_stream.as_mut_ptr()` is valid for the lifetime of the
    // stream. `codecpar` is set by `set_parameters` and is non-null.
    unsafe {
        (*(*out_stream.as_mut_ptr()).codecpar).codec_tag = 0;
    }
}

// ── Side data ───────────────────────────────────────────────────────────────

/// Size in bytes of an `AV_PKT_DATA_DISPLAYMATRIX` payload (3×3 int32).
const DISPLAY_MATRIX_BYTES: usize = 9 * std::mem::size_of::<i32>();

/// Read the 3×3 display matrix attached to a stream, if any.
///
/// Values are raw: the first two columns are 16.16 fixed point, the last
/// column 2.30. Returns `None` when the stream carries no rotation/flip.
pub fn stream_display_matrix(stream: &ffmpeg::format::stream::Stream) -> Option<[i32; 9]> {
    // SAFETY: `stream.as_ptr()` is valid while `stream` borrows its input
    // context. `av_packet_side_data_get` only walks the array bounded by
    // `nb_coded_side_data` and returns null or a pointer into it. The payload
    // is read unaligned after checking its size.
    unsafe {
        let par = (*stream.as_ptr()).codecpar;
        if par.is_null() {
            return None;
        }
        let sd = ffmpeg::ffi::av_packet_side_data_get(
            (*par).coded_side_data,
            (*par).nb_coded_side_data,
            ffmpeg::ffi::AVPacketSideDataType::AV_PKT_DATA_DISPLAYMATRIX,
        );
        if sd.is_null() || (*sd).data.is_null() || ((*sd).size as usize) < DISPLAY_MATRIX_BYTES {
            return None;
        }
        let data = (*sd).data as *const i32;
        let mut matrix = [0i32; 9];
        for (i, value) in matrix.iter_mut().enumerate() {
            *value = std::ptr::read_unaligned(data.add(i));
        }
        Some(matrix)
    }
}

/// Attach a display matrix to an output stream's codec parameters.
///
/// Used by test fixtures to synthesize rotated sources.
#[cfg(test)]
pub fn stream_set_display_matrix(
    out_stream: &mut ffmpeg::format::stream::StreamMut,
    matrix: [i32; 9],
) -> bool {
    // SAFETY: `av_packet_side_data_new` grows the codecpar side-data array
    // and returns a zeroed entry with `DISPLAY_MATRIX_BYTES` bytes of payload,
    // or null on allocation failure.
    unsafe {
        let par = (*out_stream.as_mut_ptr()).codecpar;
        if par.is_null() {
            return false;
        }
        let sd = ffmpeg::ffi::av_packet_side_data_new(
            &mut (*par).coded_side_data,
            &mut (*par).nb_coded_side_data,
            ffmpeg::ffi::AVPacketSideDataType::AV_PKT_DATA_DISPLAYMATRIX,
            DISPLAY_MATRIX_BYTES,
            0,
        );
        if sd.is_null() {
            return false;
        }
        let data = (*sd).data as *mut i32;
        for (i, value) in matrix.iter().enumerate() {
            std::ptr::write_unaligned(data.add(i), *value);
        }
        true
    }
}

// ── Codec context fields ────────────────────────────────────────────────────

/// Tell a decoder which time base its packets use, so best-effort frame
/// timestamps come out in the stream's time base.
pub fn codec_context_set_packet_time_base(
    context: &mut ffmpeg::codec::Context,
    time_base: ffmpeg::Rational,
) {
    // SAFETY: `context.as_mut_ptr()` is valid and exclusively borrowed;
    // `pkt_timebase` is a plain AVRational field read when the codec opens.
    unsafe {
        (*context.as_mut_ptr()).pkt_timebase = time_base.into();
    }
}

// ── Codec lookup ────────────────────────────────────────────────────────────

/// Returns `true` if a decoder is registered for `codec_id`.
pub fn decoder_exists(codec_id: ffmpeg::codec::Id) -> bool {
    // SAFETY: `avcodec_find_decoder` reads a global read-only registry after
    // `ffmpeg::init()`. The returned pointer is only null-checked.
    let ptr = unsafe { ffmpeg::ffi::avcodec_find_decoder(codec_id.into()) };
    !ptr.is_null()
}

// ── Packed plane access ─────────────────────────────────────────────────────

/// Bytes of valid sample data in a packed (interleaved) audio frame.
///
/// `frame.data(0)` spans the whole padded buffer; only the first
/// `samples × channels × bytes_per_sample` bytes are real samples.
pub fn packed_audio_bytes(frame: &ffmpeg::util::frame::Audio) -> &[u8] {
    let plane = frame.data(0);
    let bytes_per_sample = frame.format().bytes();
    let valid = frame.samples() * frame.channels() as usize * bytes_per_sample;
    &plane[..valid.min(plane.len())]
}
