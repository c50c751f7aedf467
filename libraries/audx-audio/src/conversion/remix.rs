//! Channel count conversion on interleaved f32 audio
//!
//! Downmixing to stereo uses ITU-R BS.775-1 coefficients:
//! - L_out = L + 0.707*C + 0.707*Ls
//! - R_out = R + 0.707*C + 0.707*Rs

use audx_core::ChannelLayout;

/// ITU-R BS.775-1 coefficient for center and surround channels (-3dB)
const CENTER_MIX: f32 = 0.707;

/// Mixing matrix from one channel layout to another
#[derive(Debug, Clone)]
pub(crate) struct ChannelRemix {
    in_channels: usize,
    out_channels: usize,
    /// `out_channels` rows of `in_channels` gains, `None` for identity
    matrix: Option<Vec<Vec<f32>>>,
}

impl ChannelRemix {
    pub(crate) fn new(input: ChannelLayout, output: ChannelLayout) -> Self {
        let in_channels = usize::from(input.channels());
        let out_channels = usize::from(output.channels());

        let matrix = if in_channels == out_channels {
            None
        } else if out_channels == 1 {
            // Average everything into mono
            Some(vec![vec![1.0 / in_channels as f32; in_channels]])
        } else if in_channels == 1 {
            // Duplicate mono to every output
            Some(vec![vec![1.0]; out_channels])
        } else if out_channels == 2 {
            Some(Self::stereo_downmix(input))
        } else {
            // Copy common channels, silence the rest
            Some(
                (0..out_channels)
                    .map(|o| (0..in_channels).map(|i| if i == o { 1.0 } else { 0.0 }).collect())
                    .collect(),
            )
        };

        Self {
            in_channels,
            out_channels,
            matrix,
        }
    }

    /// Whether samples pass through untouched
    pub(crate) fn is_identity(&self) -> bool {
        self.matrix.is_none()
    }

    /// Gains for folding a multichannel layout into stereo
    fn stereo_downmix(input: ChannelLayout) -> Vec<Vec<f32>> {
        let channels = usize::from(input.channels());
        let mask = if input.mask() == 0 {
            ChannelLayout::default_for(input.channels()).mask()
        } else {
            input.mask()
        };

        let mut left = vec![0.0; channels];
        let mut right = vec![0.0; channels];

        // Interleaved channel order follows ascending speaker bits
        let speakers = (0..64u32)
            .map(|bit| 1u64 << bit)
            .filter(|bit| mask & bit != 0)
            .take(channels);

        for (idx, speaker) in speakers.enumerate() {
            let (l, r) = match speaker {
                ChannelLayout::FRONT_LEFT => (1.0, 0.0),
                ChannelLayout::FRONT_RIGHT => (0.0, 1.0),
                ChannelLayout::FRONT_CENTER | ChannelLayout::LOW_FREQUENCY => {
                    (CENTER_MIX, CENTER_MIX)
                }
                ChannelLayout::BACK_LEFT | ChannelLayout::SIDE_LEFT => (CENTER_MIX, 0.0),
                ChannelLayout::BACK_RIGHT | ChannelLayout::SIDE_RIGHT => (0.0, CENTER_MIX),
                ChannelLayout::BACK_CENTER => (CENTER_MIX * CENTER_MIX, CENTER_MIX * CENTER_MIX),
                _ => (0.0, 0.0),
            };
            left[idx] = l;
            right[idx] = r;
        }

        vec![left, right]
    }

    /// Remix interleaved samples
    pub(crate) fn apply(&self, input: &[f32]) -> Vec<f32> {
        let Some(matrix) = &self.matrix else {
            return input.to_vec();
        };

        let frames = input.len() / self.in_channels;
        let mut output = Vec::with_capacity(frames * self.out_channels);

        for frame in input.chunks_exact(self.in_channels) {
            for gains in matrix {
                let mixed: f32 = frame.iter().zip(gains).map(|(s, g)| s * g).sum();
                output.push(mixed.clamp(-1.0, 1.0));
            }
        }

        output
    }
}
