use crate::config::{EfacConfig, SimRng};
use crate::constants::{CONVERTER_TO_USER_OFFSET, SOURCE_TO_CONVERTER_OFFSET};
use crate::energy::Energy;
use crate::energy_chunk::EnergyChunk;
use crate::error::EfacError;
use crate::state::EnergySystemsState;
use crate::systems::{
    Biker, BulbType, EnergySystemElement, EnergySystemElementCarousel, Fan, Faucet, Generator, LightBulb,
    SolarPanel, Sun, TeaKettle,
};
use glam::DVec2;
use tracing::{debug, trace};

/// Source, converter and user carousels wired into one pipeline.
///
/// Each tick the selected source runs first, its outgoing chunks are handed to
/// the selected converter, the converter runs on the source's energy, and the
/// same again for the user. Energy and chunks of a type the next stage doesn't
/// accept are not passed on.
#[derive(Debug)]
pub struct EnergySystemsModel {
    pub sources: EnergySystemElementCarousel,
    pub converters: EnergySystemElementCarousel,
    pub users: EnergySystemElementCarousel,
    config: EfacConfig,
    rng: SimRng,
    elapsed_time: f64,
}

impl EnergySystemsModel {
    pub fn new(config: EfacConfig) -> Result<Self, EfacError> {
        config.validate()?;
        let source_position = DVec2::ZERO;
        let converter_position = source_position + SOURCE_TO_CONVERTER_OFFSET;
        let user_position = converter_position + CONVERTER_TO_USER_OFFSET;

        let sources: Vec<Box<dyn EnergySystemElement>> = vec![
            Box::new(Faucet::new(source_position)),
            Box::new(Sun::new(source_position)),
            Box::new(TeaKettle::new(source_position)),
            Box::new(Biker::new(source_position)),
        ];
        let converters: Vec<Box<dyn EnergySystemElement>> = vec![
            Box::new(Generator::new(converter_position)),
            Box::new(SolarPanel::new(converter_position)),
        ];
        let users: Vec<Box<dyn EnergySystemElement>> = vec![
            Box::new(LightBulb::new(BulbType::Incandescent, user_position)),
            Box::new(LightBulb::new(BulbType::Fluorescent, user_position)),
            Box::new(Fan::new(user_position)),
        ];

        let mut model = Self {
            sources: EnergySystemElementCarousel::new(sources, source_position)?,
            converters: EnergySystemElementCarousel::new(converters, converter_position)?,
            users: EnergySystemElementCarousel::new(users, user_position)?,
            rng: config.seeded_rng(),
            config,
            elapsed_time: 0.0,
        };
        model.update_handoffs();
        model.preload_source();
        model.preload_converter();
        model.preload_user();
        Ok(model)
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn source(&self) -> &dyn EnergySystemElement {
        self.sources.selected()
    }

    pub fn converter(&self) -> &dyn EnergySystemElement {
        self.converters.selected()
    }

    pub fn user(&self) -> &dyn EnergySystemElement {
        self.users.selected()
    }

    pub fn step(&mut self, dt: f64) {
        let source_energy = self.sources.selected_mut().step(dt, &Energy::none(), &mut self.rng);

        hand_off(&mut self.sources, &mut self.converters);
        let converter_input = gate(source_energy, self.converters.selected());
        let converter_energy = self.converters.selected_mut().step(dt, &converter_input, &mut self.rng);

        hand_off(&mut self.converters, &mut self.users);
        let user_input = gate(converter_energy, self.users.selected());
        self.users.selected_mut().step(dt, &user_input, &mut self.rng);

        self.elapsed_time += dt;
    }

    pub fn select_source(&mut self, index: usize) -> Result<(), EfacError> {
        if self.sources.set_target_index(index)? {
            debug!(source = self.sources.selected().name(), "source selected");
            self.update_handoffs();
            self.preload_source();
        }
        Ok(())
    }

    pub fn select_converter(&mut self, index: usize) -> Result<(), EfacError> {
        if self.converters.set_target_index(index)? {
            debug!(converter = self.converters.selected().name(), "converter selected");
            self.update_handoffs();
            self.preload_converter();
        }
        Ok(())
    }

    pub fn select_user(&mut self, index: usize) -> Result<(), EfacError> {
        if self.users.set_target_index(index)? {
            debug!(user = self.users.selected().name(), "user selected");
            self.update_handoffs();
            self.preload_user();
        }
        Ok(())
    }

    /// Every chunk owned by a selected element.
    pub fn energy_chunks(&self) -> Vec<&EnergyChunk> {
        [&self.sources, &self.converters, &self.users]
            .into_iter()
            .flat_map(|carousel| carousel.selected().energy_chunks())
            .collect()
    }

    pub fn state(&self) -> EnergySystemsState {
        EnergySystemsState {
            selected_source: self.sources.target_index(),
            selected_converter: self.converters.target_index(),
            selected_user: self.users.target_index(),
            elements: self
                .sources
                .elements()
                .chain(self.converters.elements())
                .chain(self.users.elements())
                .map(|element| element.state())
                .collect(),
        }
    }

    /// Restore selections and element counters. Chunks in transit are not part
    /// of the state; restored elements fill up again as they run.
    ///
    /// The whole state is checked first, so a rejected state changes nothing.
    pub fn apply_state(&mut self, state: &EnergySystemsState) -> Result<(), EfacError> {
        let count = self.sources.len() + self.converters.len() + self.users.len();
        if state.elements.len() != count
            || state.selected_source >= self.sources.len()
            || state.selected_converter >= self.converters.len()
            || state.selected_user >= self.users.len()
        {
            return Err(EfacError::StateMismatch {
                expected: "energy systems with the same carousels",
                found: "energy systems of a different layout",
            });
        }
        let current = self
            .sources
            .elements()
            .chain(self.converters.elements())
            .chain(self.users.elements());
        for (element, element_state) in current.zip(&state.elements) {
            element.check_state(element_state)?;
        }

        self.sources.set_target_index(state.selected_source)?;
        self.converters.set_target_index(state.selected_converter)?;
        self.users.set_target_index(state.selected_user)?;

        let elements = self
            .sources
            .elements_mut()
            .chain(self.converters.elements_mut())
            .chain(self.users.elements_mut());
        for (element, element_state) in elements.zip(&state.elements) {
            element.apply_state(element_state)?;
        }
        self.update_handoffs();
        Ok(())
    }

    fn update_handoffs(&mut self) {
        let converter_takes = accepts_output(self.sources.selected(), self.converters.selected());
        self.sources.selected_mut().set_handoff_enabled(converter_takes);
        let user_takes = accepts_output(self.converters.selected(), self.users.selected());
        self.converters.selected_mut().set_handoff_enabled(user_takes);
        self.users.selected_mut().set_handoff_enabled(false);
    }

    fn preload_source(&mut self) {
        let max_time = self.config.preload_max_time;
        self.sources
            .selected_mut()
            .preload_energy_chunks(&Energy::none(), max_time, &mut self.rng);
        hand_off(&mut self.sources, &mut self.converters);
    }

    fn preload_converter(&mut self) {
        let max_time = self.config.preload_max_time;
        let incoming = gate(self.sources.selected().energy_output_rate(), self.converters.selected());
        self.converters
            .selected_mut()
            .preload_energy_chunks(&incoming, max_time, &mut self.rng);
        hand_off(&mut self.converters, &mut self.users);
    }

    fn preload_user(&mut self) {
        let max_time = self.config.preload_max_time;
        let incoming = gate(self.converters.selected().energy_output_rate(), self.users.selected());
        self.users
            .selected_mut()
            .preload_energy_chunks(&incoming, max_time, &mut self.rng);
    }
}

fn accepts_output(from: &dyn EnergySystemElement, to: &dyn EnergySystemElement) -> bool {
    from.output_type().is_some_and(|energy_type| to.accepts(energy_type))
}

/// `energy` if `receiver` takes its type, otherwise nothing.
fn gate(energy: Energy, receiver: &dyn EnergySystemElement) -> Energy {
    if receiver.accepts(energy.energy_type) {
        energy
    } else {
        Energy::none()
    }
}

/// Move the outgoing chunks of one stage into the next.
fn hand_off(from: &mut EnergySystemElementCarousel, to: &mut EnergySystemElementCarousel) {
    let chunks = from.selected_mut().extract_outgoing_energy_chunks();
    if chunks.is_empty() {
        return;
    }
    let receiver = to.selected_mut();
    let (accepted, rejected): (Vec<_>, Vec<_>) = chunks
        .into_iter()
        .partition(|chunk| receiver.accepts(chunk.energy_type));
    for chunk in &rejected {
        trace!(chunk = chunk.id().0, receiver = receiver.name(), "chunk not accepted downstream");
    }
    receiver.inject_energy_chunks(accepted);
}
