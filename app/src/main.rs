#![no_main]
#![no_std]

use panic_probe as _;

use hal::{self, clocks::Clocks, pac};

use oscope_algo::{
    acquisition::SnapshotPool, Acquisition, AdcDispatch, Channel, ChannelConfig, ChannelRegistry,
    Duration,
};

mod console;

use console::{LineBuffer, RequestId, RttHost};

const NUMBER_OF_CHANNELS: usize = 2;
const QUEUE_LEN: usize = 8;

const HEARTBEAT_PERIOD: Duration = Duration::millis(500);
const CONSOLE_POLL: Duration = Duration::millis(10);

static ACQUISITION: [Acquisition; NUMBER_OF_CHANNELS] = [Acquisition::new(), Acquisition::new()];
static SNAPSHOTS: SnapshotPool = SnapshotPool::new();
static DISPATCH: AdcDispatch<NUMBER_OF_CHANNELS> =
    AdcDispatch::new(ChannelRegistry::new([&ACQUISITION[0], &ACQUISITION[1]]));

type ScopeChannel = Channel<'static, RequestId, QUEUE_LEN>;

rtic_monotonics::systick_monotonic!(Mono, 1_000);

#[rtic::app(device = pac, peripherals = true, dispatchers = [TIM7])]
mod app {
    use super::*;

    use hal::gpio::Pin;
    use rtt_target::{rtt_init, DownChannel, UpChannel};

    use oscope_drivers::{
        adc::{ScopeAdc, NOMINAL_SAMPLE_RATE},
        pinout,
    };

    #[shared]
    struct Shared {
        channels: [ScopeChannel; NUMBER_OF_CHANNELS],
        responses: UpChannel,
    }

    #[local]
    struct Local {
        adc1: ScopeAdc<NUMBER_OF_CHANNELS>,
        requests: DownChannel,
        line: LineBuffer,
        next_id: RequestId,
        led: Pin,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let rtt = rtt_init! {
            up: {
                0: { size: 1024, name: "defmt" }
                1: { size: 1024, mode: NoBlockSkip, name: "Responses" }
            }
            down: {
                0: { size: 128, name: "Requests" }
            }
        };
        rtt_target::set_defmt_channel(rtt.up.0);

        let dp = ctx.device;
        let clock_cfg = Clocks::default();
        if clock_cfg.setup().is_err() {
            defmt::panic!("SYSTEM: clock setup failed");
        }
        defmt::debug!("SYSTEM: Clock frequency is {} MHz", clock_cfg.sysclk() / 1000000);

        Mono::start(ctx.core.SYST, clock_cfg.systick());

        pinout::analog::init_inputs();
        let mut adc1 = ScopeAdc::new(dp.ADC1, &clock_cfg, pinout::analog::ADC1_INPUTS);

        let config = ChannelConfig {
            sampling_rate: NOMINAL_SAMPLE_RATE,
            ..ChannelConfig::new()
        };
        let channels: [ScopeChannel; NUMBER_OF_CHANNELS] = core::array::from_fn(|i| {
            Channel::new(i as u8 + 1, &ACQUISITION[i], &SNAPSHOTS, config)
        });

        // First conversion, the interrupt keeps the rest going
        adc1.begin();

        serve_console::spawn().ok();
        heartbeat::spawn().ok();
        defmt::info!("SYSTEM: {} channels up", NUMBER_OF_CHANNELS);

        (
            Shared {
                channels,
                responses: rtt.up.1,
            },
            Local {
                adc1,
                requests: rtt.down.0,
                line: LineBuffer::new(),
                next_id: 0,
                led: pinout::led::GRN.init(),
            },
        )
    }

    #[task(binds = ADC1_2, local = [adc1], priority = 3)]
    fn adc_end_of_conversion(cx: adc_end_of_conversion::Context) {
        let raw = cx.local.adc1.read_sample();
        DISPATCH.on_conversion(cx.local.adc1, raw);
    }

    /// Runs every channel's maintenance pass until none of them asks to run again.
    #[task(priority = 1, shared = [channels, responses])]
    async fn maintenance(mut cx: maintenance::Context) {
        loop {
            let next = (&mut cx.shared.channels, &mut cx.shared.responses).lock(
                |channels, responses| {
                    let mut next: Option<Duration> = None;
                    for channel in channels.iter_mut() {
                        let mut host = RttHost::new(responses, Mono::now());
                        channel.run(&mut host);
                        if let Some(oscope_algo::Schedule::After(delay)) = host.requested() {
                            next = Some(next.map_or(delay, |n| n.min(delay)));
                        }
                    }
                    next
                },
            );

            match next {
                Some(delay) => Mono::delay(delay).await,
                None => return,
            }
        }
    }

    #[task(priority = 1, shared = [channels, responses], local = [requests, line, next_id])]
    async fn serve_console(mut cx: serve_console::Context) {
        let mut chunk = [0u8; 32];
        loop {
            let count = cx.local.requests.read(&mut chunk);
            for &byte in &chunk[..count] {
                if !cx.local.line.push(byte) {
                    continue;
                }

                if let Some(line) = cx.local.line.line() {
                    let id = *cx.local.next_id;
                    *cx.local.next_id = id.wrapping_add(1);

                    let wants_run = (&mut cx.shared.channels, &mut cx.shared.responses).lock(
                        |channels, responses| {
                            console::serve(channels, responses, id, line, Mono::now())
                        },
                    );
                    // Fails while a pass is already scheduled, which picks the request up
                    if wants_run {
                        maintenance::spawn().ok();
                    }
                } else {
                    defmt::warn!("Console: request line dropped");
                }
                cx.local.line.clear();
            }

            Mono::delay(CONSOLE_POLL).await;
        }
    }

    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        loop {
            cx.local.led.toggle();
            Mono::delay(HEARTBEAT_PERIOD).await;
        }
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
